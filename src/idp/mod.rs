//! Client for the remote identity provider (a Cognito-style user-pool API).
//!
//! The provider owns accounts, passwords and MFA policy; this module only
//! drives its protocol: sign-up, confirmation, password login and the single
//! challenge-response hop. Nothing here is retried and nothing is persisted.

pub mod challenge;
mod error;
mod secret_hash;

pub use challenge::{ChallengeDescriptor, ChallengeKind};
pub use error::Error;
pub use secret_hash::secret_hash;

use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const TARGET_SIGN_UP: &str = "AWSCognitoIdentityProviderService.SignUp";
const TARGET_CONFIRM_SIGN_UP: &str = "AWSCognitoIdentityProviderService.ConfirmSignUp";
const TARGET_INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const TARGET_RESPOND_TO_CHALLENGE: &str =
    "AWSCognitoIdentityProviderService.RespondToAuthChallenge";

const DEFAULT_EXPIRES_IN_SECONDS: u64 = 3600;

/// Resolved provider settings, injected once at startup.
#[derive(Debug, Clone)]
pub struct IdpConfig {
    region: String,
    user_pool_id: String,
    client_id: String,
    client_secret: Option<SecretString>,
    endpoint: Option<Url>,
}

impl IdpConfig {
    #[must_use]
    pub fn new(region: String, user_pool_id: String, client_id: String) -> Self {
        Self {
            region,
            user_pool_id,
            client_id,
            client_secret: None,
            endpoint: None,
        }
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: SecretString) -> Self {
        self.client_secret = Some(secret);
        self
    }

    /// Point credential calls at a non-default provider URL (tests, local stacks).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    #[must_use]
    pub fn user_pool_id(&self) -> &str {
        &self.user_pool_id
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Exact issuer expected in every verified token.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }

    /// Published signing-key endpoint for the pool.
    #[must_use]
    pub fn jwks_uri(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint.as_ref().map_or_else(
            || format!("https://cognito-idp.{}.amazonaws.com/", self.region),
            Url::to_string,
        )
    }

    /// `None` when no shared client secret is configured; callers then omit
    /// the signature field entirely.
    fn secret_hash(&self, username: &str) -> Option<String> {
        self.client_secret
            .as_ref()
            .map(|secret| secret_hash(secret.expose_secret(), username, &self.client_id))
    }
}

/// Tokens issued by the provider on a completed authentication.
///
/// Produced once per successful login or challenge completion; ownership
/// moves straight into the HTTP response.
#[derive(Debug)]
pub struct TokenBundle {
    pub id_token: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// A password login either completes with tokens or hands the caller a
/// challenge to answer.
#[derive(Debug)]
pub enum LoginOutcome {
    Tokens(TokenBundle),
    Challenge(ChallengeDescriptor),
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: IdpConfig,
}

impl Client {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: IdpConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()?;

        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &IdpConfig {
        &self.config
    }

    /// Create an account with the provider.
    ///
    /// # Errors
    /// `Validation` when a field is empty, `UsernameExists` when the name is
    /// taken, `Rejected` with the provider's message otherwise.
    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<(), Error> {
        if username.is_empty() || password.is_empty() || email.is_empty() {
            return Err(Error::Validation("username, password and email are required"));
        }

        let mut payload = json!({
            "ClientId": self.config.client_id,
            "Username": username,
            "Password": password,
            "UserAttributes": [{"Name": "email", "Value": email}],
        });
        if let Some(hash) = self.config.secret_hash(username) {
            payload["SecretHash"] = hash.into();
        }

        self.call(TARGET_SIGN_UP, &payload).await.map(|_| ())
    }

    /// Confirm a freshly registered account with the emailed code.
    ///
    /// # Errors
    /// `Validation` when a field is empty; any provider rejection (wrong or
    /// expired code, already confirmed) surfaces as the mapped variant.
    pub async fn confirm(&self, username: &str, code: &str) -> Result<(), Error> {
        if username.is_empty() || code.is_empty() {
            return Err(Error::Validation("username and code are required"));
        }

        let mut payload = json!({
            "ClientId": self.config.client_id,
            "Username": username,
            "ConfirmationCode": code,
        });
        if let Some(hash) = self.config.secret_hash(username) {
            payload["SecretHash"] = hash.into();
        }

        self.call(TARGET_CONFIRM_SIGN_UP, &payload).await.map(|_| ())
    }

    /// Password login. Completes with tokens, or returns the provider's
    /// challenge for the caller to answer via [`Client::respond_to_challenge`].
    ///
    /// # Errors
    /// `Validation` on empty fields, `InvalidCredentials` on a wrong password,
    /// `UserNotConfirmed` for unconfirmed accounts, `Rejected` otherwise.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, Error> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::Validation("username and password are required"));
        }

        let mut auth_parameters = json!({
            "USERNAME": username,
            "PASSWORD": password,
        });
        if let Some(hash) = self.config.secret_hash(username) {
            auth_parameters["SECRET_HASH"] = hash.into();
        }

        let payload = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": self.config.client_id,
            "AuthParameters": auth_parameters,
        });

        let body = self.call(TARGET_INITIATE_AUTH, &payload).await?;

        if let Some(name) = body["ChallengeName"].as_str() {
            let kind = ChallengeKind::from_provider(name);

            debug!(challenge = name, "login requires a second factor");

            let session = body["Session"]
                .as_str()
                .ok_or_else(|| Error::Protocol("challenge without a session".to_string()))?
                .to_string();

            return Ok(LoginOutcome::Challenge(ChallengeDescriptor {
                kind,
                session,
                parameters: string_map(&body["ChallengeParameters"]),
                username: username.to_string(),
            }));
        }

        Ok(LoginOutcome::Tokens(token_bundle(&body)?))
    }

    /// Answer an outstanding challenge. One hop only: if the provider answers
    /// with a further challenge the call fails and the caller must log in
    /// again, mirroring the provider's single-use session semantics.
    ///
    /// # Errors
    /// `CodeMismatch` on a wrong or expired code (terminal for the session),
    /// `UnexpectedChallenge` when the provider chains another challenge.
    pub async fn respond_to_challenge(
        &self,
        username: &str,
        code: &str,
        session: &str,
        kind: &ChallengeKind,
    ) -> Result<TokenBundle, Error> {
        if username.is_empty() || code.is_empty() || session.is_empty() {
            return Err(Error::Validation("username, code and session are required"));
        }

        let mut responses = json!({ "USERNAME": username });
        responses[kind.response_field()] = code.into();
        if let Some(hash) = self.config.secret_hash(username) {
            responses["SECRET_HASH"] = hash.into();
        }

        let payload = json!({
            "ChallengeName": kind.as_provider_name(),
            "ClientId": self.config.client_id,
            "Session": session,
            "ChallengeResponses": responses,
        });

        let body = self.call(TARGET_RESPOND_TO_CHALLENGE, &payload).await?;

        if let Some(next) = body["ChallengeName"].as_str() {
            return Err(Error::UnexpectedChallenge {
                challenge: next.to_string(),
            });
        }

        token_bundle(&body)
    }

    async fn call(&self, target: &str, payload: &Value) -> Result<Value, Error> {
        let response = self
            .http
            .post(self.config.endpoint())
            .header(CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", target)
            .body(payload.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);

            return Err(Error::from_provider(status, &body));
        }

        Ok(response.json().await?)
    }
}

fn token_bundle(body: &Value) -> Result<TokenBundle, Error> {
    let result = &body["AuthenticationResult"];

    let id_token = result["IdToken"]
        .as_str()
        .ok_or_else(|| Error::Protocol("no IdToken in AuthenticationResult".to_string()))?
        .to_string();

    Ok(TokenBundle {
        id_token,
        access_token: result["AccessToken"].as_str().map(String::from),
        refresh_token: result["RefreshToken"].as_str().map(String::from),
        expires_in: result["ExpiresIn"]
            .as_u64()
            .unwrap_or(DEFAULT_EXPIRES_IN_SECONDS),
    })
}

fn string_map(value: &Value) -> BTreeMap<String, String> {
    value.as_object().map_or_else(BTreeMap::new, |map| {
        map.iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()
    })
}
