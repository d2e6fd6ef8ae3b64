use reqwest::StatusCode;
use serde_json::Value;

/// Closed set of identity-provider failures.
///
/// Provider exception names are mapped here, at the boundary, so nothing else
/// in the crate matches on provider-specific strings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(&'static str),

    #[error("username already exists")]
    UsernameExists,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is not confirmed")]
    UserNotConfirmed,

    #[error("invalid or expired code")]
    CodeMismatch,

    /// The provider answered a challenge response with yet another challenge.
    /// One hop is the limit; a chain is a protocol error, not a retry case.
    #[error("unexpected additional challenge: {challenge}")]
    UnexpectedChallenge { challenge: String },

    #[error("{message}")]
    Rejected { message: String },

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected provider response: {0}")]
    Protocol(String),
}

impl Error {
    /// Map a non-2xx provider body (`{"__type": "...", "message": "..."}`).
    pub(crate) fn from_provider(status: StatusCode, body: &Value) -> Self {
        let kind = body["__type"].as_str().unwrap_or_default();
        // Some provider stacks namespace the type: com.example#UsernameExistsException
        let kind = kind.rsplit('#').next().unwrap_or(kind);

        match kind {
            "UsernameExistsException" => Self::UsernameExists,
            "NotAuthorizedException" => Self::InvalidCredentials,
            "UserNotConfirmedException" => Self::UserNotConfirmed,
            "CodeMismatchException" | "ExpiredCodeException" => Self::CodeMismatch,
            _ => {
                let message = body["message"]
                    .as_str()
                    .or_else(|| body["Message"].as_str())
                    .map_or_else(|| format!("provider returned {status}"), String::from);

                Self::Rejected { message }
            }
        }
    }
}
