use crate::token::{Error, IdClaims, KeySource, NormalizedIdentity};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// RS256 verification of bearer identity tokens.
///
/// A token passes only when its signature matches a published pool key, its
/// issuer and audience are exact matches, it has not expired and it is an
/// identity token rather than an access or refresh token.
#[derive(Clone)]
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    keys: Arc<dyn KeySource>,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(issuer: String, audience: String, keys: Arc<dyn KeySource>) -> Self {
        Self {
            issuer,
            audience,
            keys,
        }
    }

    /// # Errors
    /// Any failed check returns an error; callers collapse them all to the
    /// same generic 401 so responses never explain what was wrong.
    pub async fn verify(&self, token: &str) -> Result<NormalizedIdentity, Error> {
        let header = jsonwebtoken::decode_header(token)?;
        let kid = header.kid.ok_or(Error::UnknownSigningKey)?;

        let jwk = self
            .keys
            .key(&kid)
            .await?
            .ok_or(Error::UnknownSigningKey)?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = jsonwebtoken::decode::<IdClaims>(token, &key, &validation)?;

        if data.claims.token_use.as_deref() != Some("id") {
            debug!(token_use = ?data.claims.token_use, "rejected non-identity token");
            return Err(Error::WrongTokenUse);
        }

        Ok(data.claims.into_identity())
    }
}
