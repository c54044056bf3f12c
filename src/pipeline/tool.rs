//! Converter subprocess: launch, await exit, capture bounded stderr.
//!
//! stdout is discarded (pandoc writes the artifact to `-o`); stderr is drained
//! concurrently with `wait()` so a chatty converter can never block on a full
//! pipe, but only the first `limit` bytes are kept.
//!
//! The child is spawned with `kill_on_drop(true)`: if the caller's deadline
//! elapses and this future is dropped, the converter is killed rather than
//! left running in the background.

use crate::error::Md2DocError;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

/// How a converter run ended (when it could be started at all).
#[derive(Debug)]
pub struct ToolOutcome {
    pub status: ExitStatus,
    /// Captured stderr, lossily decoded and truncated to the configured limit.
    pub stderr: String,
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Convert a non-zero exit into [`Md2DocError::ToolFailed`].
    pub fn into_result(self) -> Result<Self, Md2DocError> {
        if self.success() {
            Ok(self)
        } else {
            Err(Md2DocError::ToolFailed {
                exit_code: self.status.code(),
                stderr: self.stderr,
            })
        }
    }
}

/// Run `program [prefix…] [args…]` to completion.
///
/// # Errors
/// [`Md2DocError::ToolLaunchFailed`] when the process cannot be spawned.
/// A non-zero exit is *not* an error here; see [`ToolOutcome::into_result`].
pub async fn run_tool(
    program: &Path,
    prefix: &[OsString],
    args: &[OsString],
    stderr_limit: usize,
) -> Result<ToolOutcome, Md2DocError> {
    debug!("Launching {} with {} args", program.display(), prefix.len() + args.len());

    let mut child = Command::new(program)
        .args(prefix)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Md2DocError::ToolLaunchFailed {
            program: program.display().to_string(),
            source: e,
        })?;

    let stderr = child.stderr.take();
    let (status, stderr) = tokio::join!(child.wait(), read_bounded(stderr, stderr_limit));
    let status = status.map_err(|e| Md2DocError::io("wait for converter", program, e))?;

    debug!("Converter exited with {}", status);
    Ok(ToolOutcome { status, stderr })
}

/// Drain `reader` to EOF, keeping at most `limit` bytes.
async fn read_bounded<R: AsyncRead + Unpin>(reader: Option<R>, limit: usize) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };

    let mut kept = Vec::with_capacity(limit.min(4096));
    let mut truncated = false;
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
                truncated |= n > room;
            }
        }
    }

    let mut text = String::from_utf8_lossy(&kept).into_owned();
    if truncated {
        text.push_str("\n[stderr truncated]");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_bounded_truncates() {
        let data: &[u8] = b"0123456789abcdef";
        let text = read_bounded(Some(data), 10).await;
        assert_eq!(text, "0123456789\n[stderr truncated]");
    }

    #[tokio::test]
    async fn read_bounded_keeps_short_streams_whole() {
        let data: &[u8] = b"warning: missing font\n";
        assert_eq!(read_bounded(Some(data), 1024).await, "warning: missing font\n");
        assert_eq!(read_bounded::<&[u8]>(None, 1024).await, "");
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let err = run_tool(
            Path::new("/nonexistent/definitely-not-pandoc"),
            &[],
            &["--version".into()],
            1024,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Md2DocError::ToolLaunchFailed { .. }), "got: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_maps_to_tool_failed() {
        let outcome = run_tool(
            Path::new("/bin/sh"),
            &[],
            &["-c".into(), "echo nope >&2; exit 7".into()],
            1024,
        )
        .await
        .unwrap();
        assert!(!outcome.success());
        match outcome.into_result().unwrap_err() {
            Md2DocError::ToolFailed { exit_code, stderr } => {
                assert_eq!(exit_code, Some(7));
                assert_eq!(stderr.trim(), "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
