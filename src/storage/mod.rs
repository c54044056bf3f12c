//! Object storage: where Markdown comes from and documents go.
//!
//! The handler depends on the [`ObjectStore`] trait only; the concrete store
//! is constructed once at startup and injected, so nothing in the library
//! holds a process-wide client.
//!
//! | Store | Backing | Download URLs |
//! |-------|---------|---------------|
//! | [`LocalObjectStore`] | directory per bucket | signed `file://` URLs |
//! | [`HttpObjectStore`]  | path-style HTTP endpoint (`GET`/`PUT`) | signed endpoint URLs |

pub mod http;
pub mod local;
pub mod presign;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use presign::SigningKey;

use crate::error::Md2DocError;
use async_trait::async_trait;
use std::time::Duration;

/// Port for reading sources, writing results and issuing download URLs.
///
/// All failures are reported as [`Md2DocError::Storage`] (or
/// [`Md2DocError::InvalidInput`] for malformed bucket/key names).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Md2DocError>;

    /// Fetch an object and decode it as UTF-8.
    async fn get_text(&self, bucket: &str, key: &str) -> Result<String, Md2DocError> {
        let bytes = self.get_object(bucket, key).await?;
        String::from_utf8(bytes).map_err(|e| {
            Md2DocError::storage(bucket, key, format!("object is not valid UTF-8: {e}"))
        })
    }

    /// Store `body` under `bucket/key`. Returns the object's location URI.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, Md2DocError>;

    /// A URL granting read access to `bucket/key` for `expiry`.
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, Md2DocError>;
}

/// Reject bucket and key names that could escape their bucket.
///
/// Buckets are a single path segment; keys are `/`-separated segments, none
/// of which may be empty, `.` or `..`.
pub fn validate_location(bucket: &str, key: &str) -> Result<(), Md2DocError> {
    let bad_segment = |s: &str| s.is_empty() || s == "." || s == ".." || s.contains('\\');

    if bad_segment(bucket) || bucket.contains('/') {
        return Err(Md2DocError::invalid_input(format!(
            "invalid bucket name '{bucket}'"
        )));
    }
    if key.split('/').any(bad_segment) {
        return Err(Md2DocError::invalid_input(format!("invalid object key '{key}'")));
    }
    Ok(())
}
