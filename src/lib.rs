//! # edgequake-md2doc
//!
//! Convert Markdown stored in object storage to DOCX, PDF, HTML or EPUB using
//! [pandoc](https://pandoc.org), and publish the result with a time-limited
//! download URL.
//!
//! The rendering itself is pandoc's job. This crate owns everything around it:
//! staging the input, building the command line, running the subprocess under
//! a deadline, waiting for the artifact, and making sure no temporary file
//! outlives the conversion that created it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown (object store)
//!  │
//!  ├─ 1. Resolve  apply event defaults (bucket, key, format, output key)
//!  ├─ 2. Fetch    ObjectStore::get_text
//!  ├─ 3. Stage    cover block + Markdown → unique scratch dir
//!  ├─ 4. Convert  pandoc subprocess (deadline, bounded stderr)
//!  ├─ 5. Collect  poll for the artifact, read it, delete it
//!  └─ 6. Publish  ObjectStore::put_object + presigned URL
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_md2doc::{ConversionRequest, Converter, ConverterConfig, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConverterConfig::default());
//!     let request = ConversionRequest::new("# Hello\n\nWorld", OutputFormat::Pdf)
//!         .with_meta("author", "Ada Lovelace");
//!     let written = converter.convert_to_file(&request, "hello.pdf").await?;
//!     eprintln!("wrote {written} bytes");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2doc` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-md2doc = { version = "0.1", default-features = false }
//! ```
//!
//! ## Formats
//!
//! | Format | pandoc writer | Cover image | Content type |
//! |--------|---------------|-------------|--------------|
//! | `docx` | `docx` | prepended + page break | `application/vnd.openxmlformats-officedocument.wordprocessingml.document` |
//! | `pdf`  | `pdf` (xelatex) | prepended | `application/pdf` |
//! | `html` | `html` | prepended + page break | `text/html` |
//! | `epub` | `epub2` | `--epub-cover-image` | `application/epub+zip` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod output;
pub mod pipeline;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder, HandlerSettings};
pub use convert::Converter;
pub use envelope::{ConversionSummary, HandlerResponse};
pub use error::{ErrorKind, Md2DocError};
pub use handler::{ConversionEvent, Handler};
pub use output::{ConversionRequest, ConversionResult, Metadata, OutputFormat};
pub use storage::{HttpObjectStore, LocalObjectStore, ObjectStore, SigningKey};
