//! The conversion orchestrator.
//!
//! [`Converter`] exposes one operation per output format plus the generic
//! [`Converter::convert`] they all delegate to. Every conversion follows the
//! same sequence:
//!
//! ```text
//! validate ─▶ stage input ─▶ run converter ─▶ remove input ─▶ check exit
//!          ─▶ poll for output ─▶ read + delete output ─▶ ConversionResult
//! ```
//!
//! The staged input is removed as soon as the converter exits, before the
//! exit status is inspected, so no exit path leaves it behind. The whole
//! sequence runs under the configured deadline; when it elapses the future is
//! dropped, which kills the child and removes the scratch directory.

use crate::config::ConverterConfig;
use crate::error::Md2DocError;
use crate::output::{ConversionRequest, ConversionResult, Metadata, OutputFormat};
use crate::pipeline::{args, collect, stage, tool};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs Markdown conversions through the external converter.
///
/// Cheap to clone; clones share one configuration. Conversions on the same
/// `Converter` may run concurrently, including several of the same format.
///
/// # Example
/// ```rust,no_run
/// use edgequake_md2doc::{Converter, ConverterConfig, Metadata};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = Converter::new(ConverterConfig::default());
/// let result = converter
///     .convert_to_docx("# Hello\n\nWorld", "/tmp/hello.docx", &Metadata::new(), None)
///     .await?;
/// println!("{} bytes of {}", result.len(), result.content_type());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    config: Arc<ConverterConfig>,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert Markdown to DOCX, writing the intermediate artifact to `output_path`.
    pub async fn convert_to_docx(
        &self,
        markdown: &str,
        output_path: impl AsRef<Path>,
        metadata: &Metadata,
        cover_image: Option<&Path>,
    ) -> Result<ConversionResult, Md2DocError> {
        self.convert_format(OutputFormat::Docx, markdown, output_path.as_ref(), metadata, cover_image)
            .await
    }

    /// Convert Markdown to PDF through the configured LaTeX engine.
    pub async fn convert_to_pdf(
        &self,
        markdown: &str,
        output_path: impl AsRef<Path>,
        metadata: &Metadata,
        cover_image: Option<&Path>,
    ) -> Result<ConversionResult, Md2DocError> {
        self.convert_format(OutputFormat::Pdf, markdown, output_path.as_ref(), metadata, cover_image)
            .await
    }

    /// Convert Markdown to a standalone HTML page with embedded resources.
    pub async fn convert_to_html(
        &self,
        markdown: &str,
        output_path: impl AsRef<Path>,
        metadata: &Metadata,
        cover_image: Option<&Path>,
    ) -> Result<ConversionResult, Md2DocError> {
        self.convert_format(OutputFormat::Html, markdown, output_path.as_ref(), metadata, cover_image)
            .await
    }

    /// Convert Markdown to EPUB. A cover image becomes the book cover rather
    /// than part of the text.
    pub async fn convert_to_epub(
        &self,
        markdown: &str,
        output_path: impl AsRef<Path>,
        metadata: &Metadata,
        cover_image: Option<&Path>,
    ) -> Result<ConversionResult, Md2DocError> {
        self.convert_format(OutputFormat::Epub, markdown, output_path.as_ref(), metadata, cover_image)
            .await
    }

    async fn convert_format(
        &self,
        format: OutputFormat,
        markdown: &str,
        output_path: &Path,
        metadata: &Metadata,
        cover_image: Option<&Path>,
    ) -> Result<ConversionResult, Md2DocError> {
        let request = ConversionRequest {
            markdown: markdown.to_string(),
            format,
            metadata: metadata.clone(),
            cover_image: cover_image.map(Path::to_path_buf),
        };
        self.convert(&request, output_path).await
    }

    /// Convert `request`, using `output_path` for the converter's artifact.
    ///
    /// Any file already at `output_path` is removed before the converter
    /// starts, and whatever is there afterwards is deleted on success and
    /// failure alike; `output_path` never holds the result afterwards.
    ///
    /// # Errors
    /// - [`Md2DocError::InvalidInput`] for empty Markdown or a bad cover image
    /// - [`Md2DocError::ToolLaunchFailed`] / [`Md2DocError::ToolFailed`]
    /// - [`Md2DocError::OutputMissing`] when the artifact never appears
    /// - [`Md2DocError::Timeout`] when the deadline elapses
    pub async fn convert(
        &self,
        request: &ConversionRequest,
        output_path: impl AsRef<Path>,
    ) -> Result<ConversionResult, Md2DocError> {
        let output_path = output_path.as_ref();
        let format = request.format;
        validate_request(request)?;

        let start = Instant::now();
        info!(
            "Converting {} bytes of Markdown to {}",
            request.markdown.len(),
            format
        );

        let result = match tokio::time::timeout(self.config.timeout(), self.run(request, output_path))
            .await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                discard_partial_output(output_path).await;
                Err(e)
            }
            Err(_) => {
                discard_partial_output(output_path).await;
                Err(Md2DocError::Timeout {
                    format,
                    secs: self.config.timeout_secs,
                })
            }
        };

        match &result {
            Ok(r) => info!(
                "{} conversion complete: {} bytes in {}ms",
                format,
                r.len(),
                start.elapsed().as_millis()
            ),
            Err(e) => warn!("{} conversion failed: {}", format, e),
        }
        result
    }

    /// Convert `request` using a unique scratch path for the artifact.
    pub async fn convert_buffered(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, Md2DocError> {
        let root = self.config.work_root();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Md2DocError::io("create work directory", &root, e))?;
        let scratch = tempfile::Builder::new()
            .prefix("md2doc-out-")
            .tempdir_in(&root)
            .map_err(|e| Md2DocError::io("create scratch directory", &root, e))?;
        let output_path = scratch
            .path()
            .join(format!("output.{}", request.format.extension()));

        let result = self.convert(request, &output_path).await?;

        let scratch_path = scratch.path().to_path_buf();
        scratch
            .close()
            .map_err(|e| Md2DocError::io("remove scratch directory", scratch_path, e))?;
        Ok(result)
    }

    /// Convert `request` and write the document to `dest`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    /// Returns the number of bytes written.
    pub async fn convert_to_file(
        &self,
        request: &ConversionRequest,
        dest: impl AsRef<Path>,
    ) -> Result<usize, Md2DocError> {
        let result = self.convert_buffered(request).await?;
        let dest = dest.as_ref();

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Md2DocError::io("create output directory", parent, e))?;
        }

        let tmp_path = tmp_sibling(dest, request.format);
        tokio::fs::write(&tmp_path, &result.bytes)
            .await
            .map_err(|e| Md2DocError::io("write output file", dest, e))?;
        tokio::fs::rename(&tmp_path, dest)
            .await
            .map_err(|e| Md2DocError::io("write output file", dest, e))?;

        Ok(result.len())
    }

    /// Stage, run, clean up, collect. Runs under the deadline in [`Self::convert`].
    async fn run(
        &self,
        request: &ConversionRequest,
        output_path: &Path,
    ) -> Result<ConversionResult, Md2DocError> {
        let config = &self.config;
        clear_previous_output(output_path).await?;
        let staged = stage::stage_input(&config.work_root(), request).await?;
        let argv = args::build_args(config, request, staged.path(), output_path, Utc::now());

        let launched = tool::run_tool(
            &config.program,
            &config.tool_args,
            &argv,
            config.stderr_limit_bytes,
        )
        .await;

        // The staged input goes before the exit status is even looked at.
        let cleanup = staged.remove();
        let outcome = match (launched.and_then(tool::ToolOutcome::into_result), cleanup) {
            (Ok(outcome), Ok(())) => outcome,
            (Ok(_), Err(cleanup_err)) => return Err(cleanup_err),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!("Failed to remove staged input after converter error: {}", cleanup_err);
                return Err(e);
            }
        };
        if !outcome.stderr.trim().is_empty() {
            debug!("Converter stderr: {}", outcome.stderr.trim());
        }

        collect::wait_for_output(
            output_path,
            config.output_poll_attempts,
            config.poll_interval(),
        )
        .await?;
        let bytes = collect::take_output(output_path).await?;

        Ok(ConversionResult {
            format: request.format,
            bytes,
        })
    }
}

fn validate_request(request: &ConversionRequest) -> Result<(), Md2DocError> {
    if request.markdown.trim().is_empty() {
        return Err(Md2DocError::invalid_input("Markdown text must not be empty"));
    }
    if let Some(ref cover) = request.cover_image {
        stage::validate_cover(cover)?;
    }
    Ok(())
}

/// Remove a leftover artifact so the existence poll only sees this run's output.
async fn clear_previous_output(path: &Path) -> Result<(), Md2DocError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale output {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Md2DocError::io("remove stale output", path, e)),
    }
}

/// Remove whatever a failed or killed converter may have left at `path`.
async fn discard_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
    }
}

fn tmp_sibling(dest: &Path, format: OutputFormat) -> PathBuf {
    dest.with_extension(format!("{}.tmp", format.extension()))
}
