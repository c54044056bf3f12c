//! Filesystem-backed object store: `<root>/<bucket>/<key>`.
//!
//! Useful for local runs, tests, and deployments where the "bucket" is a
//! mounted volume. Writes are atomic (temp file + rename) so a reader never
//! observes a half-written document. Content types are not persisted.

use super::presign::{self, SigningKey};
use super::{validate_location, ObjectStore};
use crate::error::Md2DocError;
use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    signing_key: SigningKey,
}

impl LocalObjectStore {
    /// Store objects under `root`, which is made absolute so that location
    /// and download URLs are stable.
    pub fn new(root: impl AsRef<Path>, signing_key: SigningKey) -> Result<Self, Md2DocError> {
        let root = std::path::absolute(root.as_ref())
            .map_err(|e| Md2DocError::io("resolve store root", root.as_ref(), e))?;
        Ok(Self { root, signing_key })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of `bucket/key`.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, Md2DocError> {
        validate_location(bucket, key)?;
        let mut path = self.root.join(bucket);
        path.extend(key.split('/'));
        Ok(path)
    }

    fn file_url(&self, bucket: &str, key: &str, path: &Path) -> Result<Url, Md2DocError> {
        Url::from_file_path(path).map_err(|_| {
            Md2DocError::storage(bucket, key, format!("cannot express '{}' as a URL", path.display()))
        })
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Md2DocError> {
        let path = self.object_path(bucket, key)?;
        debug!("Reading {}", path.display());
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Md2DocError::storage(bucket, key, "object not found")
            } else {
                Md2DocError::storage(bucket, key, e)
            }
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, Md2DocError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Md2DocError::storage(bucket, key, e))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|e| Md2DocError::storage(bucket, key, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(Md2DocError::storage(bucket, key, e));
        }

        debug!(
            "Stored {} bytes ({}) at {}",
            body.len(),
            content_type,
            path.display()
        );
        Ok(self.file_url(bucket, key, &path)?.to_string())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, Md2DocError> {
        let path = self.object_path(bucket, key)?;
        let mut url = self.file_url(bucket, key, &path)?;
        presign::sign_url(&mut url, &self.signing_key, presign::unix_now(), expiry);
        Ok(url.to_string())
    }
}
