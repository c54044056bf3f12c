//! Request and result types shared by the orchestrator and the handler.

use crate::error::Md2DocError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Document metadata handed to the converter as `-M key=value` flags.
///
/// Recognised keys are `title`, `author`, `date`, `language` and `css`;
/// anything else is passed through verbatim.
pub type Metadata = BTreeMap<String, String>;

/// Target document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Docx,
    Pdf,
    Html,
    Epub,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [Self::Docx, Self::Pdf, Self::Html, Self::Epub];

    /// Lower-case name, also used as the file extension.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Html => "html",
            Self::Epub => "epub",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// MIME type of the produced artifact.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pdf => "application/pdf",
            Self::Html => "text/html",
            Self::Epub => "application/epub+zip",
        }
    }

    /// Pandoc writer name passed to `-t`.
    pub fn writer(self) -> &'static str {
        match self {
            Self::Epub => "epub2",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Md2DocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(Self::Docx),
            "pdf" => Ok(Self::Pdf),
            "html" => Ok(Self::Html),
            "epub" => Ok(Self::Epub),
            _ => Err(Md2DocError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// One conversion: Markdown in, one target format out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub markdown: String,
    pub format: OutputFormat,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub cover_image: Option<PathBuf>,
}

impl ConversionRequest {
    pub fn new(markdown: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            markdown: markdown.into(),
            format,
            metadata: Metadata::new(),
            cover_image: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Insert a single metadata entry, replacing any previous value.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_cover_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.cover_image = Some(path.into());
        self
    }
}

/// The converted document, fully read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

impl ConversionResult {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!(" epub ".parse::<OutputFormat>().unwrap(), OutputFormat::Epub);
    }

    #[test]
    fn parse_rejects_unknown_formats() {
        let err = "odt".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, Md2DocError::UnsupportedFormat { ref format } if format == "odt"));
    }

    #[test]
    fn epub_uses_epub2_writer() {
        assert_eq!(OutputFormat::Epub.writer(), "epub2");
        assert_eq!(OutputFormat::Docx.writer(), "docx");
    }

    #[test]
    fn content_types() {
        assert_eq!(OutputFormat::Html.content_type(), "text/html");
        assert_eq!(OutputFormat::Epub.content_type(), "application/epub+zip");
        assert!(OutputFormat::Docx.content_type().ends_with("wordprocessingml.document"));
    }

    #[test]
    fn default_format_is_docx() {
        assert_eq!(OutputFormat::default(), OutputFormat::Docx);
        assert_eq!(
            serde_json::to_string(&OutputFormat::Html).unwrap(),
            "\"html\""
        );
    }
}
