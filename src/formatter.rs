/// Source canonicalization.
///
/// Text is formatted once before it is parsed and once more before it is
/// written back, so the structural model always works on canonical text.
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::FormatterKind;
use crate::error::{Error, Result};
use crate::syntax;

/// Turns raw Go source into its canonical textual form.
///
/// Implementations must be idempotent: formatting canonical text returns it
/// unchanged.
#[async_trait]
pub trait Formatter: Send + Sync {
    async fn format(&self, source: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}

/// Pick the formatter for `kind`, probing for `gofmt` when asked to.
pub fn resolve(kind: FormatterKind) -> Arc<dyn Formatter> {
    match kind {
        FormatterKind::Gofmt => Arc::new(Gofmt::default()),
        FormatterKind::Builtin => Arc::new(BuiltinFormatter),
        FormatterKind::Auto => {
            let gofmt = Gofmt::default();
            if gofmt.is_available() {
                info!("Using gofmt at {}", gofmt.binary.display());
                Arc::new(gofmt)
            } else {
                warn!("gofmt not found, falling back to the builtin formatter");
                Arc::new(BuiltinFormatter)
            }
        }
    }
}

// ── gofmt ────────────────────────────────────────────────────────────

/// Pipes source through the `gofmt` binary.
#[derive(Debug, Clone)]
pub struct Gofmt {
    pub binary: PathBuf,
}

impl Default for Gofmt {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("gofmt"),
        }
    }
}

impl Gofmt {
    /// Whether the binary can be run at all.
    #[must_use]
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("-l")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Formatter for Gofmt {
    async fn format(&self, source: &str) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Format(format!("failed to run {}: {e}", self.binary.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(source.as_bytes())
                .await
                .map_err(|e| Error::Format(format!("failed to feed gofmt: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Format(format!("gofmt did not finish: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Format(stderr.trim().to_string()));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::Format(format!("gofmt produced invalid UTF-8: {e}")))
    }

    fn name(&self) -> &'static str {
        "gofmt"
    }
}

// ── Builtin ──────────────────────────────────────────────────────────

/// Whitespace normalizer used when `gofmt` is unavailable.
///
/// Converts CRLF line endings, trims trailing whitespace, collapses runs of
/// blank lines and leaves exactly one trailing newline. Lines inside
/// multi-line raw string literals and block comments are kept byte for byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormatter;

impl BuiltinFormatter {
    pub fn format_sync(source: &str) -> Result<String> {
        let text = source.replace("\r\n", "\n");
        let verbatim = syntax::verbatim_spans(&text)?;

        let mut out = String::with_capacity(text.len());
        let mut previous_blank = true;
        let mut line_start = 0;
        for line in text.split_inclusive('\n') {
            let line_end = line_start + line.trim_end_matches('\n').len();
            let keep = verbatim
                .iter()
                .any(|s| s.start < line_end && line_end < s.end);
            let start = line_start;
            line_start += line.len();

            if keep {
                out.push_str(line);
                previous_blank = false;
                continue;
            }

            let trimmed = text[start..line_end].trim_end();
            if trimmed.is_empty() {
                if !previous_blank {
                    out.push('\n');
                }
                previous_blank = true;
                continue;
            }
            out.push_str(trimmed);
            out.push('\n');
            previous_blank = false;
        }

        while out.ends_with("\n\n") {
            out.pop();
        }
        if out.trim().is_empty() {
            out.clear();
        }
        Ok(out)
    }
}

#[async_trait]
impl Formatter for BuiltinFormatter {
    async fn format(&self, source: &str) -> Result<String> {
        Self::format_sync(source)
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}
