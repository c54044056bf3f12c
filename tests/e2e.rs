//! End-to-end tests against a real pandoc installation.
//!
//! Each test skips itself when `pandoc` is not on `PATH`, so CI without pandoc
//! stays green.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! PDF output additionally needs a LaTeX engine (`xelatex` by default):
//!   E2E_PDF=1 cargo test --test e2e pdf -- --nocapture

use edgequake_md2doc::{ConversionRequest, Converter, ConverterConfig, OutputFormat};
use std::path::PathBuf;
use std::process::Command;

// ── Test helpers ─────────────────────────────────────────────────────────────

const SAMPLE: &str = r#"# Quarterly Report

Revenue grew **12%** over the previous quarter.

## Highlights

- New warehouse opened
- Support backlog halved

```rust
fn main() {
    println!("Hello");
}
```
"#;

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/e2e-output");
    std::fs::create_dir_all(&d).ok();
    d
}

fn pandoc_available() -> bool {
    Command::new("pandoc")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Skip this test if pandoc is not installed.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if !pandoc_available() {
            println!("SKIP: pandoc not found on PATH");
            return;
        }
    }};
}

fn converter() -> Converter {
    let work = output_dir().join("work");
    Converter::new(
        ConverterConfig::builder()
            .work_dir(&work)
            .output_poll_attempts(3)
            .output_poll_interval_ms(200)
            .timeout_secs(60)
            .build()
            .unwrap(),
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_docx_round_trip() {
    e2e_skip_unless_ready!();

    let result = converter()
        .convert_buffered(&ConversionRequest::new("# Hello\n\nWorld", OutputFormat::Docx))
        .await
        .unwrap();

    assert_eq!(
        result.content_type(),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert!(!result.is_empty());
    assert!(result.into_bytes().starts_with(b"PK\x03\x04"));
}

#[tokio::test]
async fn test_docx_is_a_zip_container() {
    e2e_skip_unless_ready!();

    let dest = output_dir().join("report.docx");
    let request = ConversionRequest::new(SAMPLE, OutputFormat::Docx).with_meta("title", "Q3");
    let written = converter().convert_to_file(&request, &dest).await.unwrap();

    let bytes = std::fs::read(&dest).unwrap();
    assert_eq!(written, bytes.len());
    assert!(bytes.starts_with(b"PK\x03\x04"), "DOCX must be a ZIP archive");
    println!("✓ DOCX: {} bytes → {}", written, dest.display());
}

#[tokio::test]
async fn test_html_is_standalone() {
    e2e_skip_unless_ready!();

    let result = converter()
        .convert_buffered(&ConversionRequest::new(SAMPLE, OutputFormat::Html))
        .await
        .unwrap();
    let html = String::from_utf8(result.into_bytes()).unwrap();

    assert!(html.contains("<html"), "missing <html> element");
    assert!(html.contains("Quarterly Report"));
    assert!(html.contains("<title>Converted Document</title>"));
}

#[tokio::test]
async fn test_epub_has_mimetype_entry() {
    e2e_skip_unless_ready!();

    let result = converter()
        .convert_buffered(&ConversionRequest::new(SAMPLE, OutputFormat::Epub))
        .await
        .unwrap();
    let bytes = result.into_bytes();

    assert!(bytes.starts_with(b"PK\x03\x04"));
    assert!(bytes
        .windows(b"application/epub+zip".len())
        .any(|w| w == b"application/epub+zip"));
}

#[tokio::test]
async fn test_pdf_with_latex_engine() {
    e2e_skip_unless_ready!();
    if std::env::var("E2E_PDF").is_err() {
        println!("SKIP: set E2E_PDF=1 to run the PDF test (needs xelatex)");
        return;
    }

    let result = converter()
        .convert_buffered(&ConversionRequest::new(SAMPLE, OutputFormat::Pdf))
        .await
        .unwrap();
    assert!(result.into_bytes().starts_with(b"%PDF"));
}
