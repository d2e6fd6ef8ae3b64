use crate::idp::APP_USER_AGENT;
use crate::token::Error;
use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Source of provider signing keys, keyed by `kid`.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn key(&self, kid: &str) -> Result<Option<Jwk>, Error>;
}

/// Lazily populated cache over the pool's published JWKS document.
///
/// Keys are fetched on first use and kept for the life of the process. A
/// lookup that misses the cache triggers one refresh, so a rotated key is
/// picked up on the first token that carries its `kid`.
#[derive(Debug, Clone)]
pub struct JwksCache {
    jwks_uri: String,
    http: reqwest::Client,
    keys: Arc<RwLock<HashMap<String, Jwk>>>,
}

impl JwksCache {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(jwks_uri: String) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|err| Error::KeyFetch(err.to_string()))?;

        Ok(Self {
            jwks_uri,
            http,
            keys: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<(), Error> {
        let jwks: JwkSet = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|err| Error::KeyFetch(err.to_string()))?
            .error_for_status()
            .map_err(|err| Error::KeyFetch(err.to_string()))?
            .json()
            .await
            .map_err(|err| Error::KeyFetch(err.to_string()))?;

        let mut keys = self.keys.write().await;
        for jwk in jwks.keys {
            if let Some(kid) = jwk.common.key_id.clone() {
                keys.insert(kid, jwk);
            }
        }

        debug!(keys = keys.len(), "signing keys refreshed");

        Ok(())
    }
}

#[async_trait]
impl KeySource for JwksCache {
    async fn key(&self, kid: &str) -> Result<Option<Jwk>, Error> {
        if let Some(jwk) = self.keys.read().await.get(kid) {
            return Ok(Some(jwk.clone()));
        }

        self.refresh().await?;

        Ok(self.keys.read().await.get(kid).cloned())
    }
}
