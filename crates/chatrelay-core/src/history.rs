//! Conversation history store.
//!
//! An ordered, append-only sequence of role-tagged messages, persisted as
//! line-delimited JSON (one `{role, content}` object per line). The store is
//! loaded once at startup and only ever written back by an explicit flush.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::HistoryError;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation entry. Immutable once created; insertion order is
/// conversation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only conversation history backed by a JSONL file.
///
/// The in-memory sequence grows monotonically for the life of the process;
/// the backing file is only touched by [`HistoryStore::load`] and
/// [`HistoryStore::flush`].
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<Message>,
}

impl HistoryStore {
    /// Create an empty store that will flush to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Load persisted history from `path`.
    ///
    /// A missing file yields an empty store. Malformed lines are skipped with
    /// a warning so a damaged file can't prevent startup; well-formed lines
    /// around them still load.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    entries: Vec::new(),
                });
            }
            Err(e) => return Err(HistoryError::Io(e)),
        };

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(line) {
                Ok(message) => entries.push(message),
                Err(e) => {
                    warn!(
                        line = line_num + 1,
                        path = %path.display(),
                        "Skipping malformed history line: {}",
                        e
                    );
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(
                skipped,
                loaded = entries.len(),
                path = %path.display(),
                "History loaded with malformed lines skipped"
            );
        }

        Ok(Self { path, entries })
    }

    /// Append an entry to the end of the history. No capacity bound.
    pub fn append(&mut self, entry: Message) {
        self.entries.push(entry);
    }

    /// Write the full in-memory sequence back to the backing file,
    /// replacing its previous contents. One JSON object per line.
    pub fn flush(&self) -> Result<(), HistoryError> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;
        info!(entries = self.entries.len(), path = %self.path.display(), "History flushed");
        Ok(())
    }

    /// The ordered conversation so far.
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
