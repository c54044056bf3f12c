//! HTTP object store: path-style `GET`/`PUT` against `<endpoint>/<bucket>/<key>`.
//!
//! Works with any gateway that exposes objects over plain HTTP (an
//! S3-compatible proxy, a WebDAV share, a static file server with upload
//! support). Download URLs are signed with [`presign`](super::presign) so the
//! serving side can check them without sharing credentials with the client.

use super::presign::{self, SigningKey};
use super::{validate_location, ObjectStore};
use crate::error::Md2DocError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: Url,
    signing_key: SigningKey,
    timeout_secs: u64,
}

impl HttpObjectStore {
    /// Connect to `endpoint` (e.g. `https://objects.example.com/store`).
    pub fn new(
        endpoint: &str,
        signing_key: SigningKey,
        timeout_secs: u64,
    ) -> Result<Self, Md2DocError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            Md2DocError::InvalidConfig(format!("invalid object store endpoint '{endpoint}': {e}"))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(Md2DocError::InvalidConfig(format!(
                "object store endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Md2DocError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            signing_key,
            timeout_secs,
        })
    }

    /// Unsigned URL of `bucket/key`.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, Md2DocError> {
        validate_location(bucket, key)?;
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| Md2DocError::InvalidConfig("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        Ok(url)
    }

    fn request_error(&self, bucket: &str, key: &str, e: reqwest::Error) -> Md2DocError {
        if e.is_timeout() {
            Md2DocError::storage(bucket, key, format!("request timed out after {}s", self.timeout_secs))
        } else {
            Md2DocError::storage(bucket, key, e)
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Md2DocError> {
        let url = self.object_url(bucket, key)?;
        info!("Downloading {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(bucket, key, e))?;
        if !response.status().is_success() {
            return Err(Md2DocError::storage(
                bucket,
                key,
                format!("HTTP {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.request_error(bucket, key, e))?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, Md2DocError> {
        let url = self.object_url(bucket, key)?;
        info!("Uploading {} bytes to {}", body.len(), url);

        let response = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| self.request_error(bucket, key, e))?;
        if !response.status().is_success() {
            return Err(Md2DocError::storage(
                bucket,
                key,
                format!("upload rejected: HTTP {}", response.status()),
            ));
        }

        Ok(url.to_string())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, Md2DocError> {
        let mut url = self.object_url(bucket, key)?;
        presign::sign_url(&mut url, &self.signing_key, presign::unix_now(), expiry);
        Ok(url.to_string())
    }
}
