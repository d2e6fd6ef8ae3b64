//! Bearer-token extractor and the coarse group check.

use crate::api::handlers::AppState;
use crate::token::{self, NormalizedIdentity};
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Verified identity of the calling user.
///
/// Using this as a handler argument makes the route require a valid
/// `Authorization: Bearer <id token>` header; the request never reaches the
/// handler otherwise.
pub struct Identity(pub NormalizedIdentity);

/// Uniform rejection body. Deliberately says nothing about which check
/// failed.
#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl AuthRejection {
    pub(crate) fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Unauthorized",
        }
    }

    pub(crate) fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "Forbidden",
        }
    }

    pub(crate) fn server_error() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = parts
            .extensions
            .get::<Arc<AppState>>()
            .cloned()
            .ok_or_else(AuthRejection::server_error)?;

        let result = match bearer_token(parts) {
            Ok(token) => state.verifier().verify(&token).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(identity) => Ok(Self(identity)),
            Err(err) => {
                // The reason stays in the logs; the response stays generic
                debug!("bearer token rejected: {err}");
                Err(AuthRejection::unauthorized())
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<String, token::Error> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToString::to_string)
        .ok_or(token::Error::MissingToken)
}

/// Coarse group gate for admin-only routes. Composes after extraction: the
/// identity is already verified by the time this runs.
///
/// # Errors
/// `403 Forbidden` when the identity is not in `group`.
pub fn require_group(identity: &NormalizedIdentity, group: &str) -> Result<(), AuthRejection> {
    if identity.in_group(group) {
        Ok(())
    } else {
        Err(AuthRejection::forbidden())
    }
}
