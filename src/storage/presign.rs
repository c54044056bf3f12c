//! Time-limited download URLs signed with HMAC-SHA256.
//!
//! A presigned URL carries two query parameters:
//!
//! * `expires`: UNIX timestamp (seconds) after which the URL is dead
//! * `signature`: base64url (no padding) of
//!   `HMAC-SHA256(key, "GET\n" + <url path> + "\n" + expires)`
//!
//! Whatever serves the objects verifies with [`verify_url`] using the same
//! key. Only the path and the expiry are signed, so the URL stays valid when
//! fronted by a different host name.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

pub const EXPIRES_PARAM: &str = "expires";
pub const SIGNATURE_PARAM: &str = "signature";

/// Secret used to sign download URLs.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// A random 32-byte key (two v4 UUIDs, 244 random bits), for deployments
    /// that only need URLs to be valid for the lifetime of the process.
    pub fn generate() -> Self {
        let mut bytes = Vec::with_capacity(32);
        bytes.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        bytes.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self(bytes)
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key")
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Seconds since the UNIX epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn string_to_sign(path: &str, expires: u64) -> String {
    format!("GET\n{path}\n{expires}")
}

/// Signature for `path` expiring at `expires`.
pub fn sign(key: &SigningKey, path: &str, expires: u64) -> String {
    let mut mac = key.mac();
    mac.update(string_to_sign(path, expires).as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Append `expires` and `signature` to `url`, valid for `ttl` from `now`.
pub fn sign_url(url: &mut Url, key: &SigningKey, now: u64, ttl: Duration) {
    let expires = now.saturating_add(ttl.as_secs());
    let signature = sign(key, url.path(), expires);
    url.query_pairs_mut()
        .append_pair(EXPIRES_PARAM, &expires.to_string())
        .append_pair(SIGNATURE_PARAM, &signature);
}

/// Whether `url` carries a valid, unexpired signature at time `now`.
pub fn verify_url(url: &Url, key: &SigningKey, now: u64) -> bool {
    let mut expires = None;
    let mut signature = None;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            EXPIRES_PARAM => expires = value.parse::<u64>().ok(),
            SIGNATURE_PARAM => signature = URL_SAFE_NO_PAD.decode(value.as_bytes()).ok(),
            _ => {}
        }
    }
    let (Some(expires), Some(signature)) = (expires, signature) else {
        return false;
    };
    if now > expires {
        return false;
    }

    let mut mac = key.mac();
    mac.update(string_to_sign(url.path(), expires).as_bytes());
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(now: u64) -> (Url, SigningKey) {
        let key = SigningKey::new(b"test-secret".to_vec());
        let mut url = Url::parse("https://objects.example.com/docs/output/docx/readme.docx").unwrap();
        sign_url(&mut url, &key, now, Duration::from_secs(3600));
        (url, key)
    }

    #[test]
    fn fresh_url_verifies() {
        let (url, key) = signed(1_000);
        assert!(verify_url(&url, &key, 1_000));
        assert!(verify_url(&url, &key, 4_600));
        assert!(url.as_str().contains("expires=4600"));
    }

    #[test]
    fn expired_url_is_rejected() {
        let (url, key) = signed(1_000);
        assert!(!verify_url(&url, &key, 4_601));
    }

    #[test]
    fn tampered_path_or_expiry_is_rejected() {
        let (url, key) = signed(1_000);

        let mut other_path = url.clone();
        other_path.set_path("/docs/output/pdf/secret.pdf");
        assert!(!verify_url(&other_path, &key, 1_000));

        let sig = url
            .query_pairs()
            .find(|(k, _)| k == SIGNATURE_PARAM)
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let mut extended = Url::parse(url.as_str().split('?').next().unwrap()).unwrap();
        extended
            .query_pairs_mut()
            .append_pair(EXPIRES_PARAM, "999999")
            .append_pair(SIGNATURE_PARAM, &sig);
        assert!(!verify_url(&extended, &key, 1_000));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let (url, _) = signed(1_000);
        assert!(!verify_url(&url, &SigningKey::new(b"other".to_vec()), 1_000));
    }

    #[test]
    fn generated_keys_differ_and_debug_is_redacted() {
        let a = SigningKey::generate();
        let b = SigningKey::generate();
        assert_ne!(sign(&a, "/x", 1), sign(&b, "/x", 1));
        assert_eq!(format!("{a:?}"), "SigningKey(<redacted>)");
    }
}
