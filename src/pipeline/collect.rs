//! Output collection: wait for the artifact, read it, delete it.
//!
//! A zero exit status is not proof that the file is on disk yet; the
//! existence poll gives the filesystem a bounded grace period before the
//! conversion is declared failed.

use crate::error::Md2DocError;
use std::path::Path;
use tokio::time::{sleep, Duration};
use tracing::debug;

/// Poll for `path` up to `attempts` times, `interval` apart.
///
/// Worst-case wait is `attempts × interval`.
pub async fn wait_for_output(
    path: &Path,
    attempts: u32,
    interval: Duration,
) -> Result<(), Md2DocError> {
    for attempt in 1..=attempts {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| Md2DocError::io("check output file", path, e))?;
        if exists {
            return Ok(());
        }
        debug!(
            "Waiting for {} (attempt {}/{})",
            path.display(),
            attempt,
            attempts
        );
        sleep(interval).await;
    }

    Err(Md2DocError::OutputMissing {
        path: path.to_path_buf(),
        attempts,
    })
}

/// Read the artifact fully and remove it from disk.
pub async fn take_output(path: &Path) -> Result<Vec<u8>, Md2DocError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Md2DocError::io("read output file", path, e))?;
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| Md2DocError::io("remove output file", path, e))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn existing_file_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let start = Instant::now();
        wait_for_output(&path, 10, Duration::from_secs(1)).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn missing_file_exhausts_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.html");

        let start = Instant::now();
        let err = wait_for_output(&path, 3, Duration::from_millis(40))
            .await
            .unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(120));
        assert!(matches!(err, Md2DocError::OutputMissing { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn late_file_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.epub");
        let writer_path = path.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(60)).await;
            tokio::fs::write(writer_path, b"PK").await.unwrap();
        });

        wait_for_output(&path, 20, Duration::from_millis(25)).await.unwrap();
    }

    #[tokio::test]
    async fn take_output_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        assert_eq!(take_output(&path).await.unwrap(), b"PK\x03\x04");
        assert!(!path.exists());
    }
}
