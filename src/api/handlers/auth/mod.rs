//! Credential and token routes: registration, confirmation, login, the MFA
//! hop and the protected identity echo.

pub mod bearer;
pub mod types;

use crate::api::handlers::AppState;
use crate::idp::{self, ChallengeKind, LoginOutcome, TokenBundle};
use crate::token::decode_unverified;
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bearer::Identity;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, instrument};
use types::{
    ChallengeResponse, ConfirmRequest, JwksInfo, LoginRequest, MeResponse, MessageResponse,
    MfaRequest, RegisterRequest, TokenResponse,
};

/// Create an account with the identity provider.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, confirmation code sent", body = MessageResponse),
        (status = 400, description = "Invalid input or provider rejection", body = types::ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    match state
        .idp()
        .register(&request.username, &request.password, &request.email)
        .await
    {
        Ok(()) => message_response("REGISTER SUCCESS"),
        Err(err) => credential_error(&err),
    }
}

/// Confirm a registration with the emailed code.
#[utoipa::path(
    post,
    path = "/auth/confirm",
    request_body = ConfirmRequest,
    responses(
        (status = 200, description = "Account confirmed", body = MessageResponse),
        (status = 400, description = "Invalid input or wrong code", body = types::ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn confirm(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ConfirmRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    match state.idp().confirm(&request.username, &request.code).await {
        Ok(()) => message_response("EMAIL SUCCESS"),
        Err(err) => credential_error(&err),
    }
}

/// Password login. Completes with tokens or returns a challenge to answer
/// at `/auth/login/mfa`.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued, or a challenge to answer", body = TokenResponse),
        (status = 400, description = "Missing fields", body = types::ErrorResponse),
        (status = 401, description = "Login rejected", body = types::ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    match state
        .idp()
        .login(&request.username, &request.password)
        .await
    {
        Ok(LoginOutcome::Tokens(bundle)) => token_response(bundle),
        Ok(LoginOutcome::Challenge(descriptor)) => {
            (StatusCode::OK, Json(ChallengeResponse::from(descriptor))).into_response()
        }
        Err(err) => login_error(&err),
    }
}

/// Answer the challenge a login handed back. One hop only; if this fails the
/// frontend starts over at `/auth/login`.
#[utoipa::path(
    post,
    path = "/auth/login/mfa",
    request_body = MfaRequest,
    responses(
        (status = 200, description = "Tokens issued", body = TokenResponse),
        (status = 400, description = "Missing fields", body = types::ErrorResponse),
        (status = 401, description = "Wrong code or stale session", body = types::ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login_mfa(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<MfaRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let kind = ChallengeKind::from_provider(&request.challenge_name);

    match state
        .idp()
        .respond_to_challenge(&request.username, &request.code, &request.session, &kind)
        .await
    {
        Ok(bundle) => token_response(bundle),
        Err(err) => login_error(&err),
    }
}

/// Echo the verified identity of the caller.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The caller's verified identity", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token", body = types::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn me(identity: Identity) -> impl IntoResponse {
    Json(MeResponse { user: identity.0 })
}

/// Public pool metadata, no authentication required.
#[utoipa::path(
    get,
    path = "/auth/jwks-info",
    responses(
        (status = 200, description = "Issuer and signing-key endpoint for the pool", body = JwksInfo),
    ),
    tag = "auth"
)]
pub async fn jwks_info(state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let config = state.idp().config();

    Json(JwksInfo {
        region: config.region().to_string(),
        user_pool_id: config.user_pool_id().to_string(),
        app_client_id: config.client_id().to_string(),
        issuer: config.issuer(),
        jwks_uri: config.jwks_uri(),
    })
}

fn missing_payload() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "Missing payload"})),
    )
        .into_response()
}

fn message_response(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Issued tokens carry the user's claims; decode them (already verified by
/// issuance over TLS) to shape the response.
fn token_response(bundle: TokenBundle) -> Response {
    match decode_unverified(&bundle.id_token) {
        Ok(user) => (
            StatusCode::OK,
            Json(TokenResponse {
                token: bundle.id_token,
                refresh_token: bundle.refresh_token,
                expires_in: bundle.expires_in,
                user,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("failed to decode an issued identity token: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Login failed"})),
            )
                .into_response()
        }
    }
}

/// Register/confirm failures are all the caller's to fix, except when the
/// provider itself is unreachable.
fn credential_error(err: &idp::Error) -> Response {
    match err {
        idp::Error::Transport(_) | idp::Error::Protocol(_) => provider_unavailable(err),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}

fn login_error(err: &idp::Error) -> Response {
    match err {
        idp::Error::Validation(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
        idp::Error::Transport(_) | idp::Error::Protocol(_) => provider_unavailable(err),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}

fn provider_unavailable(err: &idp::Error) -> Response {
    error!("identity provider call failed: {err}");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({"error": "Identity provider unavailable"})),
    )
        .into_response()
}
