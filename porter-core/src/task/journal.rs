use std::path::{Path, PathBuf};

use porter_model::LogLine;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::Result;

/// In-memory buffer of structured log lines for one task, flushed to an
/// append-only file.
///
/// The buffer is owned exclusively by its task handle and cleared on every
/// flush; the on-disk file is only read back by profile fetches.
#[derive(Debug)]
pub struct Journal {
    path: Option<PathBuf>,
    lines: tokio::sync::Mutex<Vec<LogLine>>,
}

impl Journal {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            lines: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append a line to the in-memory buffer.
    pub async fn push(&self, line: LogLine) {
        self.lines.lock().await.push(line);
    }

    pub async fn buffered(&self) -> usize {
        self.lines.lock().await.len()
    }

    /// Append all buffered lines to the log file and clear the buffer.
    ///
    /// Each flush writes a leading blank line, then one JSON object per
    /// line. A journal without a path drops its buffer silently.
    pub async fn flush(&self) -> Result<()> {
        let drained: Vec<LogLine> = {
            let mut lines = self.lines.lock().await;
            std::mem::take(&mut *lines)
        };
        if drained.is_empty() {
            return Ok(());
        }
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut out = String::new();
        for line in &drained {
            out.push('\n');
            out.push_str(&serde_json::to_string(line)?);
        }
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        file.write_all(out.as_bytes()).await?;
        Ok(())
    }

    /// Best-effort read of an on-disk log, split into non-empty lines. A
    /// missing or unreadable file yields no lines rather than an error.
    pub async fn read_lines(path: &Path) -> Vec<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => content
                .lines()
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
            Err(err) => {
                debug!("task log read from {} failed: {err}", path.display());
                Vec::new()
            }
        }
    }
}
