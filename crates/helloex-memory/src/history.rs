//! Append-only conversation log.

use crate::error::MemoryError;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One logged chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// JSONL conversation log; writers are serialized by a mutex.
pub struct ConversationLog {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl ConversationLog {
    /// Open a log at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            append_lock: Mutex::new(()),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a message stamped with the current time.
    pub fn append(
        &self,
        role: Role,
        content: impl Into<String>,
    ) -> Result<ConversationMessage, MemoryError> {
        let message = ConversationMessage {
            role,
            content: content.into(),
            created_at: Some(Utc::now()),
        };
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');
        let _guard = self.append_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        debug!(
            "appended conversation message (role={:?}, len={})",
            message.role,
            message.content.len()
        );
        Ok(message)
    }

    /// Last `limit` valid messages in insertion order.
    pub fn recent(&self, limit: usize) -> Result<Vec<ConversationMessage>, MemoryError> {
        if limit == 0 || !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(&self.path)?;
        let mut window = VecDeque::with_capacity(limit.min(1024));
        let mut skipped = 0usize;
        for line in BufReader::new(file).split(b'\n') {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<ConversationMessage>(&line) {
                Ok(message) => {
                    if window.len() == limit {
                        window.pop_front();
                    }
                    window.push_back(message);
                }
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                "skipped malformed conversation lines (path={}, skipped={})",
                self.path.display(),
                skipped
            );
        }
        Ok(window.into_iter().collect())
    }
}
