//! Shared fixtures: shell-script stand-ins for pandoc.
//!
//! Scripts run as `/bin/sh <script> <args…>` through `tool_arg`, so they never
//! need the executable bit (and never hit ETXTBSY when tests run in parallel).

#![allow(dead_code)]

use edgequake_md2doc::{ConverterConfig, ConverterConfigBuilder};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Logs every argument, then copies the staged input (last argument) to the
/// `-o` path, so the "document" is exactly the text pandoc was given.
pub const COPY: &str = r#"
out=
prev=
for a in "$@"; do
  printf '%s\n' "$a" >> "$LOG"
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
cat "$prev" > "$out"
"#;

/// Exits non-zero with a diagnostic and no output.
pub const FAIL: &str = r#"
echo "pandoc: could not parse YAML header" >&2
exit 3
"#;

/// Writes a half-finished artifact to the `-o` path, then fails.
pub const PARTIAL: &str = r#"
prev=
for a in "$@"; do
  if [ "$prev" = "-o" ]; then printf 'PARTIAL' > "$a"; fi
  prev="$a"
done
exit 2
"#;

/// Claims success without writing anything.
pub const SILENT: &str = "exit 0\n";

/// Never finishes on its own.
pub const HANG: &str = "exec sleep 30\n";

/// Floods stderr, then fails.
pub const NOISY: &str = r#"
head -c 20000 /dev/zero | tr '\0' 'x' >&2
exit 1
"#;

pub struct Stub {
    dir: TempDir,
    script: PathBuf,
    log: PathBuf,
    work: PathBuf,
}

impl Stub {
    pub fn new(body: &str) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("args.log");
        let work = dir.path().join("work");
        let script = dir.path().join("pandoc.sh");
        std::fs::write(&script, format!("LOG='{}'\n{}", log.display(), body)).unwrap();
        Self {
            dir,
            script,
            log,
            work,
        }
    }

    /// Config with a fast poll so failure paths finish quickly.
    pub fn builder(&self) -> ConverterConfigBuilder {
        ConverterConfig::builder()
            .program("/bin/sh")
            .tool_arg(self.script.as_os_str())
            .work_dir(&self.work)
            .output_poll_attempts(5)
            .output_poll_interval_ms(20)
            .timeout_secs(10)
    }

    pub fn config(&self) -> ConverterConfig {
        self.builder().build().unwrap()
    }

    /// A path outside the work dir, for `Converter::convert`.
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Arguments seen by the stub, one entry per argument.
    pub fn args(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// True when nothing was left behind in the work directory.
    pub fn work_is_clean(&self) -> bool {
        match std::fs::read_dir(&self.work) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) => e.kind() == std::io::ErrorKind::NotFound,
        }
    }
}

/// Route library logs through the test harness; `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Value following `flag` in an argument list.
pub fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Every `-M key=value` pair.
pub fn metadata_args(args: &[String]) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == "-M")
        .map(|w| w[1].clone())
        .collect()
}

/// A file whose magic bytes identify it as PNG.
pub fn png_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
    bytes.extend_from_slice(&[0; 17]);
    std::fs::write(&path, bytes).unwrap();
    path
}
