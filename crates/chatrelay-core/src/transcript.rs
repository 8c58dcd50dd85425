//! Plain-text transcript of every exchange.
//!
//! Append-only file with one line per side of an exchange:
//! `<timestamp>\t<speaker> > <content>`. Embedded newlines in the content
//! are flattened to spaces so each exchange line stays one file line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

/// Timestamp format, e.g. `Aug 30 14:07:33` (day space-padded).
const TIMESTAMP_FORMAT: &str = "%b %e %H:%M:%S";

/// Appends exchange lines to a transcript file.
///
/// The file is opened per record with create+append, so external rotation
/// or truncation between exchanges is picked up automatically.
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one line for `speaker` saying `content`.
    pub fn record(&self, speaker: &str, content: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open transcript: {}", self.path.display()))?;

        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        writeln!(file, "{}\t{} > {}", timestamp, speaker, flatten(content))
            .with_context(|| "Failed to write transcript line")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replace newlines with spaces so one message is one transcript line.
fn flatten(content: &str) -> String {
    content.replace("\r\n", " ").replace(['\n', '\r'], " ")
}
