use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Keyed hash binding a username to the app client, required by the provider
/// on every credential call when the client has a shared secret.
///
/// `base64(hmac_sha256(client_secret, username + client_id))`
#[must_use]
pub fn secret_hash(client_secret: &str, username: &str, client_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());

    Base64::encode_string(&mac.finalize().into_bytes())
}
