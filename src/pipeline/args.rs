//! Converter argument construction and metadata defaults.
//!
//! The shape of the command line is identical for every format; only the
//! writer, a handful of format-specific flags, and the metadata defaults
//! differ:
//!
//! ```text
//! pandoc -f markdown -t <writer> -o <output>
//!        [--pdf-engine=…] [--reference-doc=…]
//!        --highlight-style=<style> --standalone [--embed-resources]
//!        [--epub-cover-image=…] [-M key=value …] [--css=…]
//!        <input>
//! ```

use crate::config::ConverterConfig;
use crate::output::{ConversionRequest, Metadata, OutputFormat};
use chrono::{DateTime, SecondsFormat, Utc};
use std::ffi::OsString;
use std::path::Path;

/// Stylesheet linked into HTML output unless the caller supplies `css`.
pub const DEFAULT_CSS: &str = "https://cdn.jsdelivr.net/npm/water.css@2/out/water.css";

/// Format-specific metadata defaults.
pub fn default_metadata(format: OutputFormat, now: DateTime<Utc>) -> Metadata {
    let date = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let pairs: Vec<(&str, String)> = match format {
        OutputFormat::Docx | OutputFormat::Pdf => vec![
            ("title", "Converted Document".into()),
            ("author", "Markdown Converter".into()),
            ("date", date),
        ],
        OutputFormat::Html => vec![
            ("title", "Converted Document".into()),
            ("author", "Markdown Converter".into()),
            ("date", date),
            ("css", DEFAULT_CSS.into()),
        ],
        OutputFormat::Epub => vec![
            ("title", "Document".into()),
            ("author", "Author".into()),
            ("language", "en".into()),
        ],
    };
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Merge caller metadata over the defaults; caller values win.
pub fn resolve_metadata(format: OutputFormat, supplied: &Metadata, now: DateTime<Utc>) -> Metadata {
    let mut merged = default_metadata(format, now);
    merged.extend(
        supplied
            .iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    merged
}

/// Build the converter arguments for one request (tool prefix not included).
pub fn build_args(
    config: &ConverterConfig,
    request: &ConversionRequest,
    input: &Path,
    output: &Path,
    now: DateTime<Utc>,
) -> Vec<OsString> {
    let format = request.format;
    let mut args: Vec<OsString> = vec![
        "-f".into(),
        "markdown".into(),
        "-t".into(),
        format.writer().into(),
        "-o".into(),
        output.into(),
    ];

    match format {
        OutputFormat::Pdf => args.push(format!("--pdf-engine={}", config.pdf_engine).into()),
        OutputFormat::Docx => {
            if let Some(ref reference) = config.reference_doc {
                args.push(flag_with_path("--reference-doc=", reference));
            }
        }
        _ => {}
    }

    args.push(format!("--highlight-style={}", config.highlight_style).into());
    args.push("--standalone".into());
    if format == OutputFormat::Html {
        args.push("--embed-resources".into());
    }

    if format == OutputFormat::Epub {
        if let Some(ref cover) = request.cover_image {
            args.push(flag_with_path("--epub-cover-image=", cover));
        }
    }

    for (key, value) in resolve_metadata(format, &request.metadata, now) {
        match key.as_str() {
            "css" => args.push(format!("--css={value}").into()),
            "language" => {
                args.push("-M".into());
                args.push(format!("lang={value}").into());
            }
            _ => {
                args.push("-M".into());
                args.push(format!("{key}={value}").into());
            }
        }
    }

    args.push(input.into());
    args
}

fn flag_with_path(flag: &str, path: &Path) -> OsString {
    let mut s = OsString::from(flag);
    s.push(path);
    s
}
