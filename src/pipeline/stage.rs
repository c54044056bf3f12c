//! Input staging: write the Markdown (plus optional cover block) to disk.
//!
//! pandoc reads its input from a file path. Each conversion gets its own
//! `TempDir`, so two conversions of the same format never share a path, and
//! the directory is removed when [`StagedInput`] is dropped even if the
//! surrounding future is cancelled or panics. The orchestrator still calls
//! [`StagedInput::remove`] explicitly right after the converter exits so that
//! removal failures surface as errors instead of being lost in `Drop`.

use crate::error::Md2DocError;
use crate::output::{ConversionRequest, OutputFormat};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Page-break directive placed after the cover for DOCX and HTML.
pub const PAGE_BREAK: &str = "\\newpage";

/// A Markdown file staged for one converter run.
#[derive(Debug)]
pub struct StagedInput {
    dir: TempDir,
    path: PathBuf,
}

impl StagedInput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file and its scratch directory.
    pub fn remove(self) -> Result<(), Md2DocError> {
        let dir_path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| Md2DocError::io("remove staged input", dir_path, e))
    }
}

/// Compose the text actually handed to the converter.
///
/// DOCX and HTML get the cover followed by a page break, PDF gets the bare
/// cover image, and EPUB is never modified: its cover travels as
/// `--epub-cover-image` instead.
pub fn staged_text<'a>(
    markdown: &'a str,
    format: OutputFormat,
    cover_image: Option<&Path>,
) -> Cow<'a, str> {
    let Some(cover) = cover_image else {
        return Cow::Borrowed(markdown);
    };
    let image = image_reference(cover);
    match format {
        OutputFormat::Docx | OutputFormat::Html => {
            Cow::Owned(format!("{image}\n\n{PAGE_BREAK}\n\n{markdown}"))
        }
        OutputFormat::Pdf => Cow::Owned(format!("{image}\n\n{markdown}")),
        OutputFormat::Epub => Cow::Borrowed(markdown),
    }
}

/// Markdown image syntax for `path`, using angle brackets when the path
/// contains characters that would end a bare link destination.
fn image_reference(path: &Path) -> String {
    let p = path.to_string_lossy();
    if p.chars().any(|c| c.is_whitespace() || c == '(' || c == ')') {
        format!("![](<{p}>)")
    } else {
        format!("![]({p})")
    }
}

/// Reject cover paths that do not exist or are not a recognisable image.
pub fn validate_cover(path: &Path) -> Result<(), Md2DocError> {
    if !path.is_file() {
        return Err(Md2DocError::invalid_input(format!(
            "cover image not found: '{}'",
            path.display()
        )));
    }
    let reader = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| Md2DocError::io("read cover image", path, e))?;
    if reader.format().is_none() {
        return Err(Md2DocError::invalid_input(format!(
            "cover image '{}' is not a recognised image format",
            path.display()
        )));
    }
    Ok(())
}

/// Write the request's Markdown into a fresh scratch directory under `work_root`.
pub async fn stage_input(
    work_root: &Path,
    request: &ConversionRequest,
) -> Result<StagedInput, Md2DocError> {
    tokio::fs::create_dir_all(work_root)
        .await
        .map_err(|e| Md2DocError::io("create work directory", work_root, e))?;

    let dir = tempfile::Builder::new()
        .prefix(&format!("md2doc-{}-", request.format))
        .tempdir_in(work_root)
        .map_err(|e| Md2DocError::io("create scratch directory", work_root, e))?;
    let path = dir.path().join(format!("input-{}.md", request.format));

    let text = staged_text(
        &request.markdown,
        request.format,
        request.cover_image.as_deref(),
    );
    tokio::fs::write(&path, text.as_bytes())
        .await
        .map_err(|e| Md2DocError::io("write staged input", &path, e))?;

    debug!("Staged {} bytes at {}", text.len(), path.display());
    Ok(StagedInput { dir, path })
}
