//! Response envelope returned by the invocation handler.
//!
//! The shape mirrors an API-gateway proxy response: a status code plus a
//! JSON-encoded body string.

use crate::error::{ErrorKind, Md2DocError};
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};

pub const SUCCESS_MESSAGE: &str = "Conversion completed successfully";
pub const FAILURE_MESSAGE: &str = "Error processing request";

/// `{ statusCode, body }` as returned to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn success(summary: &ConversionSummary) -> Self {
        Self::json(200, &SuccessBody {
            message: SUCCESS_MESSAGE,
            summary,
        })
    }

    /// Every failure maps to 500; `errorKind` tells the kinds apart.
    pub fn failure(error: &Md2DocError) -> Self {
        Self::json(500, &FailureBody {
            message: FAILURE_MESSAGE,
            error: error.to_string(),
            error_kind: error.kind(),
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Hand-built failure body for when serde itself gave up.
    fn encoding_failure(error: &Md2DocError) -> Self {
        Self {
            status_code: 500,
            body: format!(
                r#"{{"message":"{FAILURE_MESSAGE}","error":"{}","errorKind":"{:?}"}}"#,
                error.to_string().replace(['"', '\\', '\n'], "'"),
                error.kind()
            ),
        }
    }

    fn json<T: Serialize>(status_code: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self { status_code, body },
            Err(e) => Self::encoding_failure(&Md2DocError::Internal(format!(
                "failed to encode response: {e}"
            ))),
        }
    }
}

/// What a successful invocation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    /// Location URI of the stored document, or `"local"` when nothing was uploaded.
    pub output_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub format: OutputFormat,
    pub content_type: String,
    /// Human-readable URL lifetime, e.g. `"1 hour"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<String>,
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    message: &'static str,
    #[serde(flatten)]
    summary: &'a ConversionSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureBody {
    message: &'static str,
    error: String,
    error_kind: ErrorKind,
}

/// Render a duration in seconds as `"1 hour"`, `"30 minutes"`, `"45 seconds"`.
pub fn describe_expiry(secs: u64) -> String {
    let (n, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn summary() -> ConversionSummary {
        ConversionSummary {
            output_location: "file:///store/docs/output/docx/readme.docx".into(),
            download_url: Some("file:///store/docs/output/docx/readme.docx?expires=1".into()),
            format: OutputFormat::Docx,
            content_type: OutputFormat::Docx.content_type().into(),
            expires_in: Some(describe_expiry(3600)),
        }
    }

    #[test]
    fn success_body_is_flat_camel_case() {
        let resp = HandlerResponse::success(&summary());
        assert_eq!(resp.status_code, 200);
        let body: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body["message"], SUCCESS_MESSAGE);
        assert_eq!(body["format"], "docx");
        assert_eq!(body["expiresIn"], "1 hour");
        assert!(body["downloadUrl"].as_str().unwrap().contains("expires="));
        assert!(body["outputLocation"].is_string());
    }

    #[test]
    fn local_summary_omits_url_fields() {
        let local = ConversionSummary {
            output_location: "local".into(),
            download_url: None,
            expires_in: None,
            ..summary()
        };
        let body: Value = serde_json::from_str(&HandlerResponse::success(&local).body).unwrap();
        assert_eq!(body["outputLocation"], "local");
        assert!(body.get("downloadUrl").is_none());
        assert!(body.get("expiresIn").is_none());
    }

    #[test]
    fn failure_preserves_error_kind() {
        let resp = HandlerResponse::failure(&Md2DocError::ToolFailed {
            exit_code: Some(43),
            stderr: String::new(),
        });
        assert_eq!(resp.status_code, 500);
        assert!(!resp.is_success());
        let body: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body["message"], FAILURE_MESSAGE);
        assert_eq!(body["errorKind"], "ToolExecutionError");
        assert!(body["error"].as_str().unwrap().contains("43"));
    }

    #[test]
    fn encoding_failure_is_valid_json() {
        let resp = HandlerResponse::encoding_failure(&Md2DocError::Internal(
            r#"bad "value" in C:\path"#.into(),
        ));
        assert_eq!(resp.status_code, 500);
        let body: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body["errorKind"], "InternalError");
        assert_eq!(body["message"], FAILURE_MESSAGE);
        assert!(body["error"].as_str().unwrap().contains("bad 'value'"));
    }

    #[test]
    fn response_serialises_status_code_in_camel_case() {
        let json = serde_json::to_value(HandlerResponse::success(&summary())).unwrap();
        assert_eq!(json["statusCode"], 200);
    }

    #[test]
    fn expiry_descriptions() {
        assert_eq!(describe_expiry(3600), "1 hour");
        assert_eq!(describe_expiry(7200), "2 hours");
        assert_eq!(describe_expiry(1800), "30 minutes");
        assert_eq!(describe_expiry(60), "1 minute");
        assert_eq!(describe_expiry(90), "90 seconds");
        assert_eq!(describe_expiry(5400), "90 minutes");
    }
}
