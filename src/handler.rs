//! Invocation handler: object store in, converter in the middle, object store out.
//!
//! ```text
//! ConversionEvent ─▶ resolve defaults ─▶ get_text ─▶ derive title
//!                 ─▶ Converter ─▶ put_object ─▶ presigned URL ─▶ HandlerResponse
//! ```
//!
//! The store and the converter are injected once at construction and shared
//! by every invocation. [`Handler::handle`] never fails: errors become the 500
//! envelope, with the error kind preserved for the caller.

use crate::config::HandlerSettings;
use crate::convert::Converter;
use crate::envelope::{describe_expiry, ConversionSummary, HandlerResponse};
use crate::error::Md2DocError;
use crate::output::{ConversionRequest, Metadata, OutputFormat};
use crate::storage::ObjectStore;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

/// First level-one ATX heading, used as the document title when none is given.
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").unwrap());

/// The invocation payload (camelCase JSON).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionEvent {
    pub source_bucket: Option<String>,
    pub source_key: Option<String>,
    /// docx, pdf, html or epub. Default: docx.
    pub output_format: Option<String>,
    pub output_bucket: Option<String>,
    /// Default: `output/<format>/<source stem>.<format>`.
    pub output_key: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub cover_image_path: Option<PathBuf>,
}

/// An event with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Job {
    source_bucket: String,
    source_key: String,
    format: OutputFormat,
    output_bucket: Option<String>,
    output_key: String,
    metadata: Metadata,
    cover_image: Option<PathBuf>,
}

pub struct Handler {
    store: Arc<dyn ObjectStore>,
    converter: Converter,
    settings: HandlerSettings,
}

impl Handler {
    pub fn new(store: Arc<dyn ObjectStore>, converter: Converter, settings: HandlerSettings) -> Self {
        Self {
            store,
            converter,
            settings,
        }
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    /// Handle one invocation, always producing an envelope.
    pub async fn handle(&self, event: ConversionEvent) -> HandlerResponse {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("invocation", %request_id);
        async {
            match self.process(event).await {
                Ok(summary) => HandlerResponse::success(&summary),
                Err(e) => {
                    error!("Invocation failed: {}", e);
                    HandlerResponse::failure(&e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Handle a raw JSON payload; malformed JSON is an input-validation failure.
    pub async fn handle_json(&self, payload: &str) -> HandlerResponse {
        match serde_json::from_str::<ConversionEvent>(payload) {
            Ok(event) => self.handle(event).await,
            Err(e) => HandlerResponse::failure(&Md2DocError::invalid_input(format!(
                "event is not valid JSON: {e}"
            ))),
        }
    }

    /// Run one invocation, returning the typed error on failure.
    pub async fn process(&self, event: ConversionEvent) -> Result<ConversionSummary, Md2DocError> {
        debug!(
            "Received event: {}",
            serde_json::to_string(&event).unwrap_or_default()
        );
        let job = self.resolve(event)?;

        info!("Reading markdown from {}/{}", job.source_bucket, job.source_key);
        let markdown = self
            .store
            .get_text(&job.source_bucket, &job.source_key)
            .await?;

        let mut metadata = job.metadata;
        if metadata.get("title").map_or(true, |t| t.trim().is_empty()) {
            if let Some(title) = extract_title(&markdown) {
                debug!("Using first heading as title: {}", title);
                metadata.insert("title".to_string(), title);
            }
        }

        let request = ConversionRequest {
            markdown,
            format: job.format,
            metadata,
            cover_image: job.cover_image,
        };
        info!("Converting markdown to {}", job.format.as_str().to_uppercase());
        let result = self.converter.convert_buffered(&request).await?;
        let content_type = result.content_type().to_string();

        let Some(output_bucket) = job.output_bucket else {
            info!("No output bucket configured; keeping result local");
            return Ok(ConversionSummary {
                output_location: "local".to_string(),
                download_url: None,
                format: job.format,
                content_type,
                expires_in: None,
            });
        };

        info!("Uploading converted file to {}/{}", output_bucket, job.output_key);
        let output_location = self
            .store
            .put_object(&output_bucket, &job.output_key, result.into_bytes(), &content_type)
            .await?;
        let download_url = self
            .store
            .presigned_get_url(&output_bucket, &job.output_key, self.settings.url_expiry())
            .await?;

        Ok(ConversionSummary {
            output_location,
            download_url: Some(download_url),
            format: job.format,
            content_type,
            expires_in: Some(describe_expiry(self.settings.url_expiry_secs)),
        })
    }

    fn resolve(&self, event: ConversionEvent) -> Result<Job, Md2DocError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let source_bucket = present(event.source_bucket).or_else(|| self.settings.default_bucket.clone());
        let source_key = present(event.source_key).or_else(|| self.settings.default_source_key.clone());
        let (Some(source_bucket), Some(source_key)) = (source_bucket, source_key) else {
            return Err(Md2DocError::invalid_input(
                "Missing required parameters: sourceBucket and sourceKey",
            ));
        };

        let format = match present(event.output_format) {
            Some(raw) => raw.parse()?,
            None => OutputFormat::default(),
        };
        let output_bucket = present(event.output_bucket).or_else(|| self.settings.default_bucket.clone());
        let output_key =
            present(event.output_key).unwrap_or_else(|| default_output_key(&source_key, format));

        Ok(Job {
            source_bucket,
            source_key,
            format,
            output_bucket,
            output_key,
            metadata: event.metadata,
            cover_image: event.cover_image_path,
        })
    }
}

/// `output/<format>/<stem>.<format>`, where `<stem>` is the source file name
/// up to its first dot.
pub fn default_output_key(source_key: &str, format: OutputFormat) -> String {
    let file_name = source_key.rsplit('/').next().unwrap_or(source_key);
    let stem = file_name.split('.').next().unwrap_or_default();
    let stem = if stem.is_empty() { "document" } else { stem };
    format!("output/{}/{}.{}", format, stem, format.extension())
}

/// Text of the first `# Heading` line, if any.
pub fn extract_title(markdown: &str) -> Option<String> {
    RE_TITLE
        .captures(markdown)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::storage::{LocalObjectStore, SigningKey};

    fn handler(settings: HandlerSettings) -> Handler {
        let store = LocalObjectStore::new("/nonexistent-store", SigningKey::generate()).unwrap();
        Handler::new(
            Arc::new(store),
            Converter::new(ConverterConfig::default()),
            settings,
        )
    }

    #[test]
    fn output_key_defaults_from_source_stem() {
        assert_eq!(
            default_output_key("notes/2024/readme.md", OutputFormat::Pdf),
            "output/pdf/readme.pdf"
        );
        assert_eq!(
            default_output_key("archive.tar.md", OutputFormat::Epub),
            "output/epub/archive.epub"
        );
        assert_eq!(
            default_output_key("dir/.hidden", OutputFormat::Docx),
            "output/docx/document.docx"
        );
    }

    #[test]
    fn title_is_first_h1_only() {
        let md = "intro\n## Not this\n#  The Title  \n# Second\n";
        assert_eq!(extract_title(md).as_deref(), Some("The Title"));
        assert_eq!(extract_title("## h2 only\ntext"), None);
        assert_eq!(extract_title("#hashtag"), None);
    }

    #[test]
    fn resolve_applies_settings_defaults() {
        let h = handler(HandlerSettings {
            default_bucket: Some("docs".into()),
            default_source_key: Some("inbox/readme.md".into()),
            url_expiry_secs: 600,
        });
        let job = h.resolve(ConversionEvent::default()).unwrap();
        assert_eq!(job.source_bucket, "docs");
        assert_eq!(job.source_key, "inbox/readme.md");
        assert_eq!(job.format, OutputFormat::Docx);
        assert_eq!(job.output_bucket.as_deref(), Some("docs"));
        assert_eq!(job.output_key, "output/docx/readme.docx");
    }

    #[test]
    fn resolve_requires_source() {
        let h = handler(HandlerSettings::default());
        let event = ConversionEvent {
            source_bucket: Some("docs".into()),
            source_key: Some("   ".into()),
            ..Default::default()
        };
        let err = h.resolve(event).unwrap_err();
        assert!(err.to_string().contains("sourceBucket and sourceKey"));
    }

    #[test]
    fn resolve_rejects_unknown_format() {
        let h = handler(HandlerSettings::default());
        let event = ConversionEvent {
            source_bucket: Some("docs".into()),
            source_key: Some("a.md".into()),
            output_format: Some("rtf".into()),
            ..Default::default()
        };
        assert!(matches!(
            h.resolve(event),
            Err(Md2DocError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn event_parses_camel_case() {
        let event: ConversionEvent = serde_json::from_str(
            r#"{"sourceBucket":"b","sourceKey":"k.md","outputFormat":"PDF",
                "metadata":{"author":"Ada"},"coverImagePath":"/tmp/c.png"}"#,
        )
        .unwrap();
        assert_eq!(event.output_format.as_deref(), Some("PDF"));
        assert_eq!(event.metadata["author"], "Ada");
        assert_eq!(event.cover_image_path, Some(PathBuf::from("/tmp/c.png")));
        assert!(event.output_bucket.is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_failure() {
        let resp = handler(HandlerSettings::default()).handle_json("{not json").await;
        assert_eq!(resp.status_code, 500);
        assert!(resp.body.contains("InputValidationError"));
    }
}
