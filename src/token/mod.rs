//! Token handling: non-verifying decode, the signing-key cache and the
//! RS256 verification used by the bearer extractor.

pub mod decode;
pub mod jwks;
pub mod verify;

pub use decode::decode_unverified;
pub use jwks::{JwksCache, KeySource};
pub use verify::TokenVerifier;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

/// Token failures. Everything here collapses to a generic 401 at the HTTP
/// boundary; the variants exist for logs and tests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing bearer token")]
    MissingToken,

    #[error("token signed with an unknown key")]
    UnknownSigningKey,

    #[error("token is not an identity token")]
    WrongTokenUse,

    #[error("signing key fetch failed: {0}")]
    KeyFetch(String),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Identity shape handed to handlers and serialized in login responses,
/// independent of the provider's claim names.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedIdentity {
    pub subject: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub groups: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl NormalizedIdentity {
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// Raw identity-token claims as the provider writes them.
#[derive(Debug, Deserialize)]
pub(crate) struct IdClaims {
    pub sub: String,
    #[serde(rename = "cognito:username")]
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,
    pub token_use: Option<String>,
    pub iat: Option<i64>,
    pub exp: Option<i64>,
}

impl IdClaims {
    /// Pools without a preferred username omit the claim; the subject id is
    /// the stable fallback.
    pub(crate) fn into_identity(self) -> NormalizedIdentity {
        let username = self.username.unwrap_or_else(|| self.sub.clone());

        NormalizedIdentity {
            subject: self.sub,
            username,
            email: self.email,
            groups: self.groups.into_iter().collect(),
            issued_at: self.iat,
            expires_at: self.exp,
        }
    }
}
