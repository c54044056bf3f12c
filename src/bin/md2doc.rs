//! CLI binary for edgequake-md2doc.
//!
//! A thin shim over the library crate: `convert` drives the orchestrator
//! directly on a local file, `invoke` runs the full handler against an object
//! store exactly as a serverless runtime would.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_md2doc::{
    ConversionRequest, Converter, ConverterConfig, Handler, HandlerSettings, HttpObjectStore,
    LocalObjectStore, Metadata, ObjectStore, OutputFormat, SigningKey,
};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a local file to DOCX in the current directory
  md2doc convert README.md

  # Several formats at once, with metadata and a cover
  md2doc convert book.md -f pdf,epub,html -o dist --title "My Book" --author "Ada" --cover cover.png

  # Run the handler against a directory-backed store
  echo '{"sourceBucket":"docs","sourceKey":"notes/readme.md","outputFormat":"pdf"}' \
    | md2doc invoke --store-root ./store

  # Run the handler against an HTTP object endpoint
  md2doc invoke --event event.json --store-endpoint https://objects.example.com/store

EVENT FIELDS (camelCase JSON):
  sourceBucket    Bucket holding the Markdown       (default: $BUCKET_NAME)
  sourceKey       Key of the Markdown object        (default: $S3_MARKDOWN_KEY)
  outputFormat    docx | pdf | html | epub          (default: docx)
  outputBucket    Destination bucket                (default: $BUCKET_NAME)
  outputKey       Destination key                   (default: output/<fmt>/<stem>.<fmt>)
  metadata        {title, author, date, language, css, …}
  coverImagePath  Local path of a cover image

ENVIRONMENT VARIABLES:
  MD2DOC_PANDOC           Converter executable (default: pandoc)
  MD2DOC_WORK_DIR         Scratch directory root (default: system temp dir)
  MD2DOC_TIMEOUT          Per-conversion deadline in seconds
  MD2DOC_STORE_ROOT       Directory-backed object store root
  MD2DOC_STORE_ENDPOINT   HTTP object store endpoint
  MD2DOC_SIGNING_KEY      Secret for download URL signatures
  BUCKET_NAME             Default source/output bucket
  S3_MARKDOWN_KEY         Default source key
  MD2DOC_URL_EXPIRY_SECS  Download URL lifetime (default: 3600)

A .env file in the working directory is loaded automatically.
"#;

/// Convert Markdown to DOCX, PDF, HTML and EPUB with pandoc.
#[derive(Parser, Debug)]
#[command(
    name = "md2doc",
    version,
    about = "Convert Markdown to DOCX, PDF, HTML and EPUB with pandoc",
    long_about = "Convert Markdown documents to DOCX, PDF, HTML or EPUB using pandoc, either \
from a local file or through the object-store handler used in serverless deployments.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    converter: ConverterArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MD2DOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MD2DOC_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct ConverterArgs {
    /// Converter executable.
    #[arg(long, global = true, env = "MD2DOC_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// Directory for per-conversion scratch space.
    #[arg(long, global = true, env = "MD2DOC_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Deadline for one conversion in seconds.
    #[arg(long, global = true, env = "MD2DOC_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Checks for the output file after pandoc exits.
    #[arg(long, global = true, env = "MD2DOC_POLL_ATTEMPTS", default_value_t = 10)]
    poll_attempts: u32,

    /// Milliseconds between output-file checks.
    #[arg(long, global = true, env = "MD2DOC_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Syntax highlighting theme.
    #[arg(long, global = true, env = "MD2DOC_HIGHLIGHT_STYLE", default_value = "tango")]
    highlight_style: String,

    /// LaTeX engine for PDF output.
    #[arg(long, global = true, env = "MD2DOC_PDF_ENGINE", default_value = "xelatex")]
    pdf_engine: String,

    /// Reference document supplying DOCX styles.
    #[arg(long, global = true, env = "MD2DOC_REFERENCE_DOC")]
    reference_doc: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a local Markdown file to one or more formats.
    Convert(ConvertArgs),
    /// Run the object-store handler on one invocation event.
    Invoke(InvokeArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Markdown file to convert.
    input: PathBuf,

    /// Output formats, comma-separated.
    #[arg(short, long, value_enum, value_delimiter = ',', default_value = "docx")]
    format: Vec<FormatArg>,

    /// Directory to write the documents into.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Document title.
    #[arg(long)]
    title: Option<String>,

    /// Document author.
    #[arg(long)]
    author: Option<String>,

    /// Document date.
    #[arg(long)]
    date: Option<String>,

    /// Document language (e.g. en, fr-CA).
    #[arg(long)]
    language: Option<String>,

    /// Stylesheet URL for HTML output.
    #[arg(long)]
    css: Option<String>,

    /// Extra metadata entry, KEY=VALUE. Repeatable.
    #[arg(long = "meta", value_parser = parse_key_val)]
    meta: Vec<(String, String)>,

    /// Cover image.
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "MD2DOC_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct InvokeArgs {
    /// Event JSON file; `-` or omitted reads stdin.
    #[arg(long)]
    event: Option<PathBuf>,

    /// Directory-backed object store root.
    #[arg(long, env = "MD2DOC_STORE_ROOT", conflicts_with = "store_endpoint")]
    store_root: Option<PathBuf>,

    /// HTTP object store endpoint.
    #[arg(long, env = "MD2DOC_STORE_ENDPOINT")]
    store_endpoint: Option<String>,

    /// HTTP request timeout for the object store in seconds.
    #[arg(long, env = "MD2DOC_STORE_TIMEOUT", default_value_t = 60)]
    store_timeout: u64,

    /// Secret for download URL signatures; random per run when unset.
    #[arg(long, env = "MD2DOC_SIGNING_KEY", hide_env_values = true)]
    signing_key: Option<String>,

    /// Default bucket (overrides BUCKET_NAME).
    #[arg(long)]
    bucket: Option<String>,

    /// Default source key (overrides S3_MARKDOWN_KEY).
    #[arg(long)]
    source_key: Option<String>,

    /// Download URL lifetime in seconds (overrides MD2DOC_URL_EXPIRY_SECS).
    #[arg(long)]
    url_expiry: Option<u64>,

    /// Pretty-print the response envelope.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Docx,
    Pdf,
    Html,
    Epub,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Docx => OutputFormat::Docx,
            FormatArg::Pdf => OutputFormat::Pdf,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Epub => OutputFormat::Epub,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback `convert` needs; keep library INFO
    // logs for `invoke`, where they are the only trace of what happened.
    let spinner_active = matches!(&cli.command, Command::Convert(a) if !a.no_progress) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner_active {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let converter = Converter::new(build_config(&cli.converter).context("Invalid configuration")?);

    match cli.command {
        Command::Convert(args) => run_convert(&converter, args, cli.quiet).await,
        Command::Invoke(args) => run_invoke(converter, args).await,
    }
}

/// Map CLI args to `ConverterConfig`.
fn build_config(args: &ConverterArgs) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .program(&args.pandoc)
        .timeout_secs(args.timeout)
        .output_poll_attempts(args.poll_attempts)
        .output_poll_interval_ms(args.poll_interval_ms)
        .highlight_style(&args.highlight_style)
        .pdf_engine(&args.pdf_engine);

    if let Some(ref dir) = args.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(ref reference) = args.reference_doc {
        builder = builder.reference_doc(reference);
    }

    Ok(builder.build()?)
}

async fn run_convert(converter: &Converter, args: ConvertArgs, quiet: bool) -> Result<()> {
    let markdown = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let stem = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let metadata = build_metadata(&args);

    let mut formats: Vec<OutputFormat> = Vec::new();
    for f in &args.format {
        let f = OutputFormat::from(*f);
        if !formats.contains(&f) {
            formats.push(f);
        }
    }

    let spinner = (!quiet && !args.no_progress).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(
            formats
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let jobs = formats.iter().map(|&format| {
        let request = ConversionRequest {
            markdown: markdown.clone(),
            format,
            metadata: metadata.clone(),
            cover_image: args.cover.clone(),
        };
        let dest = args.output_dir.join(format!("{stem}.{}", format.extension()));
        async move {
            let started = Instant::now();
            let written = converter.convert_to_file(&request, &dest).await;
            (format, dest, written, started.elapsed())
        }
    });
    let results = join_all(jobs).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let mut failed = 0usize;
    for (format, dest, written, elapsed) in &results {
        match written {
            Ok(bytes) => {
                if !quiet {
                    eprintln!(
                        "  {} {:<5} {}  {}  {}",
                        green("✓"),
                        format.as_str(),
                        bold(&dest.display().to_string()),
                        dim(&format!("{bytes} bytes")),
                        dim(&format!("{:.1}s", elapsed.as_secs_f64())),
                    );
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("  {} {:<5} {}", red("✗"), format.as_str(), red(&e.to_string()));
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} conversions failed", results.len());
    }
    Ok(())
}

fn build_metadata(args: &ConvertArgs) -> Metadata {
    let mut metadata: Metadata = args.meta.iter().cloned().collect();
    let named = [
        ("title", &args.title),
        ("author", &args.author),
        ("date", &args.date),
        ("language", &args.language),
        ("css", &args.css),
    ];
    for (key, value) in named {
        if let Some(v) = value {
            metadata.insert(key.to_string(), v.clone());
        }
    }
    metadata
}

async fn run_invoke(converter: Converter, args: InvokeArgs) -> Result<()> {
    let payload = read_event(args.event.as_ref()).await?;

    let signing_key = args
        .signing_key
        .map(|k| SigningKey::new(k.into_bytes()))
        .unwrap_or_else(SigningKey::generate);
    let store: Arc<dyn ObjectStore> = match (args.store_endpoint, args.store_root) {
        (Some(endpoint), _) => Arc::new(
            HttpObjectStore::new(&endpoint, signing_key, args.store_timeout)
                .context("Invalid object store endpoint")?,
        ),
        (None, Some(root)) => Arc::new(
            LocalObjectStore::new(&root, signing_key).context("Invalid object store root")?,
        ),
        (None, None) => bail!("No object store configured: pass --store-root or --store-endpoint"),
    };

    let mut settings = HandlerSettings::from_env().context("Invalid handler settings")?;
    if let Some(bucket) = args.bucket {
        settings.default_bucket = Some(bucket);
    }
    if let Some(key) = args.source_key {
        settings.default_source_key = Some(key);
    }
    if let Some(secs) = args.url_expiry {
        settings.url_expiry_secs = secs;
    }

    let handler = Handler::new(store, converter, settings);
    let response = handler.handle_json(&payload).await;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("Failed to serialise response")?;
    println!("{rendered}");

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn read_event(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => tokio::fs::read_to_string(p)
            .await
            .with_context(|| format!("Failed to read event from {}", p.display())),
        _ => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read event from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse `KEY=VALUE` for `--meta`.
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
