pub mod auth;
pub(crate) mod health;

use crate::{idp, token::TokenVerifier};

/// Shared per-process state, injected into handlers via `Extension`.
#[derive(Debug, Clone)]
pub struct AppState {
    idp: idp::Client,
    verifier: TokenVerifier,
}

impl AppState {
    #[must_use]
    pub fn new(idp: idp::Client, verifier: TokenVerifier) -> Self {
        Self { idp, verifier }
    }

    #[must_use]
    pub fn idp(&self) -> &idp::Client {
        &self.idp
    }

    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }
}
