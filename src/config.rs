//! Configuration types for Markdown conversion.
//!
//! Converter behaviour is controlled through [`ConverterConfig`], built via
//! its [`ConverterConfigBuilder`]. Handler defaults (bucket names, URL expiry)
//! live in [`HandlerSettings`], which can also be read from the environment
//! the way a serverless deployment injects them.

use crate::error::Md2DocError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the conversion orchestrator.
///
/// Built via [`ConverterConfig::builder()`] or using
/// [`ConverterConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_md2doc::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .program("/opt/bin/pandoc")
///     .timeout_secs(60)
///     .output_poll_attempts(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Converter executable. Default: `pandoc` (resolved through `PATH`).
    pub program: PathBuf,

    /// Arguments placed before the generated ones, e.g. a script path when
    /// `program` is an interpreter or a wrapper such as `xvfb-run`.
    pub tool_args: Vec<OsString>,

    /// Directory under which per-invocation scratch directories are created.
    /// If None, uses the system temp directory.
    pub work_dir: Option<PathBuf>,

    /// How many times to look for the output file after a successful exit.
    /// Default: 10.
    ///
    /// Some converter/runtime combinations (notably LaTeX-backed PDF output on
    /// network filesystems) flush the artifact slightly after the process
    /// exits. Every format gets the same bounded wait.
    pub output_poll_attempts: u32,

    /// Delay between output-file checks in milliseconds. Default: 1000.
    pub output_poll_interval_ms: u64,

    /// Deadline for one whole conversion (staging, subprocess, poll, read) in
    /// seconds. Default: 120. The child process is killed when it elapses.
    pub timeout_secs: u64,

    /// Maximum bytes of converter stderr kept for diagnostics. Default: 8192.
    pub stderr_limit_bytes: usize,

    /// Syntax highlighting theme. Default: `tango`.
    pub highlight_style: String,

    /// LaTeX engine used for PDF output. Default: `xelatex`.
    pub pdf_engine: String,

    /// Reference document supplying DOCX styles.
    pub reference_doc: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
            tool_args: Vec::new(),
            work_dir: None,
            output_poll_attempts: 10,
            output_poll_interval_ms: 1000,
            timeout_secs: 120,
            stderr_limit_bytes: 8192,
            highlight_style: "tango".to_string(),
            pdf_engine: "xelatex".to_string(),
            reference_doc: None,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.output_poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Root directory for scratch space.
    pub fn work_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.program = program.into();
        self
    }

    pub fn tool_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.config.tool_args.push(arg.into());
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn output_poll_attempts(mut self, n: u32) -> Self {
        self.config.output_poll_attempts = n.max(1);
        self
    }

    pub fn output_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.output_poll_interval_ms = ms;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn stderr_limit_bytes(mut self, n: usize) -> Self {
        self.config.stderr_limit_bytes = n;
        self
    }

    pub fn highlight_style(mut self, style: impl Into<String>) -> Self {
        self.config.highlight_style = style.into();
        self
    }

    pub fn pdf_engine(mut self, engine: impl Into<String>) -> Self {
        self.config.pdf_engine = engine.into();
        self
    }

    pub fn reference_doc(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.reference_doc = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, Md2DocError> {
        let c = &self.config;
        if c.program.as_os_str().is_empty() {
            return Err(Md2DocError::InvalidConfig(
                "Converter program must not be empty".into(),
            ));
        }
        if c.timeout_secs == 0 {
            return Err(Md2DocError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        let max_poll_ms = c.output_poll_interval_ms.saturating_mul(c.output_poll_attempts as u64);
        if max_poll_ms >= c.timeout_secs.saturating_mul(1000) {
            return Err(Md2DocError::InvalidConfig(format!(
                "Output poll budget ({}ms) must be shorter than the timeout ({}s)",
                max_poll_ms, c.timeout_secs
            )));
        }
        if c.highlight_style.trim().is_empty() || c.pdf_engine.trim().is_empty() {
            return Err(Md2DocError::InvalidConfig(
                "highlight_style and pdf_engine must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Defaults applied by the invocation handler to incomplete events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSettings {
    /// Bucket used when an event names no source or output bucket.
    pub default_bucket: Option<String>,
    /// Source key used when an event names none.
    pub default_source_key: Option<String>,
    /// Lifetime of generated download URLs in seconds. Default: 3600.
    pub url_expiry_secs: u64,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            default_bucket: None,
            default_source_key: None,
            url_expiry_secs: 3600,
        }
    }
}

impl HandlerSettings {
    /// Read `BUCKET_NAME`, `S3_MARKDOWN_KEY` and `MD2DOC_URL_EXPIRY_SECS`.
    ///
    /// Empty variables count as unset.
    pub fn from_env() -> Result<Self, Md2DocError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let url_expiry_secs = match var("MD2DOC_URL_EXPIRY_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Md2DocError::InvalidConfig(format!(
                    "MD2DOC_URL_EXPIRY_SECS must be a number of seconds, got '{raw}'"
                ))
            })?,
            None => Self::default().url_expiry_secs,
        };

        Ok(Self {
            default_bucket: var("BUCKET_NAME"),
            default_source_key: var("S3_MARKDOWN_KEY"),
            url_expiry_secs,
        })
    }

    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.url_expiry_secs)
    }
}
