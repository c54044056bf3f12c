//! Error types for the edgequake-md2doc library.
//!
//! Every failure is fatal for the conversion that raised it: the orchestrator
//! never retries beyond the output-existence poll, so there is a single error
//! type, [`Md2DocError`]. Each variant carries the context needed to diagnose
//! it (exit code, captured stderr, path, underlying `io::Error`).
//!
//! [`ErrorKind`] collapses the variants into the coarse classes reported in the
//! handler's failure envelope, so API consumers can branch on the kind without
//! parsing the message.

use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-md2doc library.
#[derive(Debug, Error)]
pub enum Md2DocError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required request field is missing or malformed.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The requested output format is not one of docx, pdf, html, epub.
    #[error("Unsupported output format '{format}'\nSupported formats: docx, pdf, html, epub.")]
    UnsupportedFormat { format: String },

    // ── Converter errors ──────────────────────────────────────────────────
    /// The converter process could not be started at all.
    #[error("Failed to launch converter '{program}': {source}\nIs pandoc installed and on PATH? Set --pandoc to override.")]
    ToolLaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran but reported failure.
    #[error("Converter {}{}", describe_exit(*exit_code), describe_stderr(stderr))]
    ToolFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The converter exited 0 but never produced its output file.
    #[error("Output file not found after {attempts} attempts: '{path}'")]
    OutputMissing { path: PathBuf, attempts: u32 },

    /// The whole conversion exceeded its deadline.
    #[error("{format} conversion timed out after {secs}s\nIncrease --timeout.")]
    Timeout { format: OutputFormat, secs: u64 },

    // ── Storage errors ────────────────────────────────────────────────────
    /// Reading from or writing to the object store failed.
    #[error("Object store error for '{bucket}/{key}': {detail}")]
    Storage {
        bucket: String,
        key: String,
        detail: String,
    },

    // ── Local I/O errors ──────────────────────────────────────────────────
    /// A local filesystem operation failed.
    #[error("Failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Md2DocError {
    /// Shorthand for [`Md2DocError::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Md2DocError::Storage`].
    pub fn storage(bucket: &str, key: &str, detail: impl fmt::Display) -> Self {
        Self::Storage {
            bucket: bucket.to_string(),
            key: key.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Shorthand for [`Md2DocError::Io`].
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Coarse classification used in response envelopes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } | Self::UnsupportedFormat { .. } => {
                ErrorKind::InputValidationError
            }
            Self::ToolLaunchFailed { .. } => ErrorKind::ToolLaunchError,
            Self::ToolFailed { .. } => ErrorKind::ToolExecutionError,
            Self::OutputMissing { .. } => ErrorKind::OutputMissingError,
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::Storage { .. } => ErrorKind::StorageError,
            Self::Io { .. } => ErrorKind::FilesystemError,
            Self::InvalidConfig(_) => ErrorKind::ConfigurationError,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }
}

/// Error classes reported as `errorKind` in the failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InputValidationError,
    ToolLaunchError,
    ToolExecutionError,
    OutputMissingError,
    TimeoutError,
    StorageError,
    FilesystemError,
    ConfigurationError,
    InternalError,
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with code {c}"),
        None => "was terminated by a signal".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
