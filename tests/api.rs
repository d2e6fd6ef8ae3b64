//! End-to-end tests over the assembled router: a mock identity provider
//! answers the credential calls and publishes the JWKS used for
//! verification.

use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use pordisto::api::{self, AppState};
use pordisto::idp::{Client, IdpConfig};
use pordisto::token::{JwksCache, TokenVerifier, decode_unverified};
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REGION: &str = "us-east-1";
const POOL: &str = "us-east-1_testpool";
const CLIENT_ID: &str = "app-client-id";
const KID: &str = "key-1";

struct SigningKey {
    pem: String,
    jwk: Value,
}

fn signing_key() -> &'static SigningKey {
    static KEY: OnceLock<SigningKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = private.to_public_key();

        SigningKey {
            pem: private.to_pkcs8_pem(LineEnding::LF).unwrap().to_string(),
            jwk: json!({
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "kid": KID,
                "n": Base64UrlUnpadded::encode_string(&public.n().to_bytes_be()),
                "e": Base64UrlUnpadded::encode_string(&public.e().to_bytes_be()),
            }),
        }
    })
}

fn issuer() -> String {
    format!("https://cognito-idp.{REGION}.amazonaws.com/{POOL}")
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn sign_token(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());

    jsonwebtoken::encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(signing_key().pem.as_bytes()).unwrap(),
    )
    .unwrap()
}

fn id_claims() -> Value {
    json!({
        "sub": "sub-1234",
        "cognito:username": "alice",
        "email": "alice@example.com",
        "cognito:groups": ["admin"],
        "token_use": "id",
        "iss": issuer(),
        "aud": CLIENT_ID,
        "iat": now(),
        "exp": now() + 3600,
    })
}

async fn test_server() -> (MockServer, TestServer) {
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"keys": [signing_key().jwk.clone()]})),
        )
        .mount(&provider)
        .await;

    let config = IdpConfig::new(REGION.to_string(), POOL.to_string(), CLIENT_ID.to_string())
        .with_client_secret(SecretString::from("app-client-secret".to_string()))
        .with_endpoint(Url::parse(&provider.uri()).unwrap());

    let client = Client::new(config.clone()).unwrap();
    let keys = JwksCache::new(format!("{}/.well-known/jwks.json", provider.uri())).unwrap();
    let verifier = TokenVerifier::new(config.issuer(), CLIENT_ID.to_string(), Arc::new(keys));

    let app = api::app(Arc::new(AppState::new(client, verifier)));

    (provider, TestServer::new(app).unwrap())
}

async fn mock_provider_call(provider: &MockServer, target: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", target))
        .respond_with(response)
        .mount(provider)
        .await;
}

#[tokio::test]
async fn test_health_reports_app_header() {
    let (_provider, server) = test_server().await;

    let response = server.get("/health").await;
    response.assert_status(StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json();
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
}

#[tokio::test]
async fn test_register_success() {
    let (provider, server) = test_server().await;
    mock_provider_call(
        &provider,
        "AWSCognitoIdentityProviderService.SignUp",
        ResponseTemplate::new(200).set_body_json(json!({"UserConfirmed": false})),
    )
    .await;

    let response = server
        .post("/auth/register")
        .json(&json!({
            "username": "alice",
            "password": "Password1!",
            "email": "alice@example.com",
        }))
        .await;

    response.assert_status(StatusCode::OK);
    response.assert_json(&json!({"message": "REGISTER SUCCESS"}));
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let (provider, server) = test_server().await;
    mock_provider_call(
        &provider,
        "AWSCognitoIdentityProviderService.SignUp",
        ResponseTemplate::new(400).set_body_json(json!({
            "__type": "UsernameExistsException",
            "message": "User already exists",
        })),
    )
    .await;

    let response = server
        .post("/auth/register")
        .json(&json!({
            "username": "alice",
            "password": "Password1!",
            "email": "alice@example.com",
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({"error": "username already exists"}));
}

#[tokio::test]
async fn test_register_missing_payload() {
    let (_provider, server) = test_server().await;

    let response = server.post("/auth/register").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_confirm_success() {
    let (provider, server) = test_server().await;
    mock_provider_call(
        &provider,
        "AWSCognitoIdentityProviderService.ConfirmSignUp",
        ResponseTemplate::new(200).set_body_json(json!({})),
    )
    .await;

    let response = server
        .post("/auth/confirm")
        .json(&json!({"username": "alice", "code": "123456"}))
        .await;

    response.assert_status(StatusCode::OK);
    response.assert_json(&json!({"message": "EMAIL SUCCESS"}));
}

#[tokio::test]
async fn test_login_issues_tokens() {
    let (provider, server) = test_server().await;
    let id_token = sign_token(&id_claims());

    mock_provider_call(
        &provider,
        "AWSCognitoIdentityProviderService.InitiateAuth",
        ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": {
                "IdToken": id_token,
                "RefreshToken": "refresh-token",
                "ExpiresIn": 3600,
            },
        })),
    )
    .await;

    let response = server
        .post("/auth/login")
        .json(&json!({"username": "alice", "password": "Password1!"}))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["token"], id_token.as_str());
    assert_eq!(body["refreshToken"], "refresh-token");
    assert_eq!(body["expiresIn"], 3600);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["groups"], json!(["admin"]));
}

#[tokio::test]
async fn test_login_wrong_password_is_generic_401() {
    let (provider, server) = test_server().await;
    mock_provider_call(
        &provider,
        "AWSCognitoIdentityProviderService.InitiateAuth",
        ResponseTemplate::new(400).set_body_json(json!({
            "__type": "NotAuthorizedException",
            "message": "Incorrect username or password.",
        })),
    )
    .await;

    let response = server
        .post("/auth/login")
        .json(&json!({"username": "alice", "password": "wrong"}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({"error": "invalid username or password"}));
}

#[tokio::test]
async fn test_login_returns_challenge() {
    let (provider, server) = test_server().await;
    mock_provider_call(
        &provider,
        "AWSCognitoIdentityProviderService.InitiateAuth",
        ResponseTemplate::new(200).set_body_json(json!({
            "ChallengeName": "SOFTWARE_TOKEN_MFA",
            "Session": "opaque-session-handle",
            "ChallengeParameters": {},
        })),
    )
    .await;

    let response = server
        .post("/auth/login")
        .json(&json!({"username": "alice", "password": "Password1!"}))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["challenge"]["name"], "SOFTWARE_TOKEN_MFA");
    assert_eq!(body["challenge"]["session"], "opaque-session-handle");
    assert_eq!(
        body["challenge"]["message"],
        "Enter the code from your authenticator app"
    );
    assert_eq!(body["challenge"]["username"], "alice");
}

#[tokio::test]
async fn test_mfa_completes_login() {
    let (provider, server) = test_server().await;
    let id_token = sign_token(&id_claims());

    mock_provider_call(
        &provider,
        "AWSCognitoIdentityProviderService.RespondToAuthChallenge",
        ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": {"IdToken": id_token, "ExpiresIn": 3600},
        })),
    )
    .await;

    let response = server
        .post("/auth/login/mfa")
        .json(&json!({
            "username": "alice",
            "code": "123456",
            "session": "opaque-session-handle",
            "challengeName": "SOFTWARE_TOKEN_MFA",
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn test_mfa_wrong_code() {
    let (provider, server) = test_server().await;
    mock_provider_call(
        &provider,
        "AWSCognitoIdentityProviderService.RespondToAuthChallenge",
        ResponseTemplate::new(400).set_body_json(json!({
            "__type": "CodeMismatchException",
            "message": "Invalid code received for user",
        })),
    )
    .await;

    let response = server
        .post("/auth/login/mfa")
        .json(&json!({
            "username": "alice",
            "code": "000000",
            "session": "opaque-session-handle",
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({"error": "invalid or expired code"}));
}

#[tokio::test]
async fn test_mfa_missing_fields() {
    let (_provider, server) = test_server().await;

    let response = server
        .post("/auth/login/mfa")
        .json(&json!({"username": "alice", "code": "", "session": ""}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_requires_bearer() {
    let (_provider, server) = test_server().await;

    let response = server.get("/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({"error": "Unauthorized"}));
}

#[tokio::test]
async fn test_me_rejects_non_bearer_scheme() {
    let (_provider, server) = test_server().await;

    let response = server
        .get("/auth/me")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_identity() {
    let (_provider, server) = test_server().await;
    let token = sign_token(&id_claims());

    let response = server
        .get("/auth/me")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"]["subject"], "sub-1234");
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_me_rejects_expired_token() {
    let (_provider, server) = test_server().await;
    let mut claims = id_claims();
    claims["exp"] = (now() - 120).into();
    let token = sign_token(&claims);

    let response = server
        .get("/auth/me")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({"error": "Unauthorized"}));
}

#[tokio::test]
async fn test_me_rejects_access_token() {
    let (_provider, server) = test_server().await;
    let mut claims = id_claims();
    claims["token_use"] = "access".into();
    let token = sign_token(&claims);

    let response = server
        .get("/auth/me")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_foreign_audience() {
    let (_provider, server) = test_server().await;
    let mut claims = id_claims();
    claims["aud"] = "another-client".into();
    let token = sign_token(&claims);

    let response = server
        .get("/auth/me")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_jwks_info_is_public() {
    let (_provider, server) = test_server().await;

    let response = server.get("/auth/jwks-info").await;
    response.assert_status(StatusCode::OK);
    response.assert_json(&json!({
        "region": REGION,
        "userPoolId": POOL,
        "appClientId": CLIENT_ID,
        "issuer": issuer(),
        "jwksUri": format!("{}/.well-known/jwks.json", issuer()),
    }));
}

// The unverified decode used to shape login responses and the full
// verification path must agree on the identity they produce.
#[tokio::test]
async fn test_decode_and_verify_agree() {
    let token = sign_token(&id_claims());

    let decoded = decode_unverified(&token).unwrap();

    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"keys": [signing_key().jwk.clone()]})),
        )
        .mount(&provider)
        .await;

    let verifier = TokenVerifier::new(
        issuer(),
        CLIENT_ID.to_string(),
        Arc::new(JwksCache::new(provider.uri()).unwrap()),
    );
    let verified = verifier.verify(&token).await.unwrap();

    assert_eq!(decoded.subject, verified.subject);
    assert_eq!(decoded.username, verified.username);
    assert_eq!(decoded.groups, verified.groups);
}
