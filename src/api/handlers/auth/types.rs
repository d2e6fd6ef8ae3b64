//! Request and response bodies for the auth routes.

use crate::idp::ChallengeDescriptor;
use crate::token::NormalizedIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmRequest {
    pub username: String,
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MfaRequest {
    pub username: String,
    pub code: String,
    pub session: String,
    /// Challenge name echoed back from the login response.
    #[serde(default = "default_challenge_name")]
    pub challenge_name: String,
}

fn default_challenge_name() -> String {
    "SMS_MFA".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// The verified-issuance identity token, used as the bearer credential.
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub user: NormalizedIdentity,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeResponse {
    pub challenge: ChallengeBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeBody {
    pub name: String,
    pub session: String,
    pub parameters: BTreeMap<String, String>,
    pub message: String,
    pub username: String,
}

impl From<ChallengeDescriptor> for ChallengeResponse {
    fn from(descriptor: ChallengeDescriptor) -> Self {
        Self {
            challenge: ChallengeBody {
                name: descriptor.kind.as_provider_name().to_string(),
                message: descriptor.message().to_string(),
                session: descriptor.session,
                parameters: descriptor.parameters,
                username: descriptor.username,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: NormalizedIdentity,
}

/// Public pool metadata so frontends can configure their own token libraries.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JwksInfo {
    pub region: String,
    pub user_pool_id: String,
    pub app_client_id: String,
    pub issuer: String,
    pub jwks_uri: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
