use std::collections::BTreeMap;
use std::fmt;

/// Second-factor challenge kinds the provider may demand after a password
/// login. Unlisted names are carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeKind {
    SmsMfa,
    SoftwareTokenMfa,
    EmailOtp,
    NewPasswordRequired,
    Other(String),
}

impl ChallengeKind {
    #[must_use]
    pub fn from_provider(name: &str) -> Self {
        match name {
            "SMS_MFA" => Self::SmsMfa,
            "SOFTWARE_TOKEN_MFA" => Self::SoftwareTokenMfa,
            "EMAIL_OTP" => Self::EmailOtp,
            "NEW_PASSWORD_REQUIRED" => Self::NewPasswordRequired,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_provider_name(&self) -> &str {
        match self {
            Self::SmsMfa => "SMS_MFA",
            Self::SoftwareTokenMfa => "SOFTWARE_TOKEN_MFA",
            Self::EmailOtp => "EMAIL_OTP",
            Self::NewPasswordRequired => "NEW_PASSWORD_REQUIRED",
            Self::Other(name) => name,
        }
    }

    /// Fixed table from challenge kind to the answer field the provider
    /// expects; anything unlisted uses the generic field.
    #[must_use]
    pub fn response_field(&self) -> &'static str {
        match self {
            Self::SmsMfa => "SMS_MFA_CODE",
            Self::SoftwareTokenMfa => "SOFTWARE_TOKEN_MFA_CODE",
            Self::EmailOtp => "EMAIL_OTP_CODE",
            Self::NewPasswordRequired | Self::Other(_) => "ANSWER",
        }
    }

    /// Human-readable prompt returned to the frontend with the challenge.
    #[must_use]
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::SmsMfa => "Enter the code sent to your phone",
            Self::SoftwareTokenMfa => "Enter the code from your authenticator app",
            Self::EmailOtp => "Enter the code sent to your email",
            Self::NewPasswordRequired => "A new password is required before signing in",
            Self::Other(_) => "Additional authentication challenge required",
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_provider_name())
    }
}

/// A login held open by the provider pending a second factor.
///
/// `session` is an opaque provider handle: it is handed back verbatim on the
/// challenge response and never inspected. The provider enforces its expiry
/// and single-use semantics.
#[derive(Debug, Clone)]
pub struct ChallengeDescriptor {
    pub kind: ChallengeKind,
    pub session: String,
    pub parameters: BTreeMap<String, String>,
    pub username: String,
}

impl ChallengeDescriptor {
    #[must_use]
    pub fn message(&self) -> &'static str {
        self.kind.prompt()
    }
}
