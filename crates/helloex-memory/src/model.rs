//! Memory record model used by backends.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted memory record, one JSON object per log line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Record identifier (`mem_<hex>`).
    pub id: String,
    /// Stored text.
    pub text: String,
    /// Embedding of `text` computed by the backend embedder.
    pub vector: Vec<f32>,
    /// Labels attached at creation time.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MemoryRecord {
    /// Build a record with a fresh identifier.
    pub fn new(text: impl Into<String>, vector: Vec<f32>, tags: Vec<String>) -> Self {
        Self {
            id: new_memory_id(),
            text: text.into(),
            vector,
            tags: normalize_tags(tags),
        }
    }
}

/// Generate a new opaque memory identifier.
pub fn new_memory_id() -> String {
    format!("mem_{}", Uuid::new_v4().simple())
}

/// Trim labels and drop blanks and duplicates, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|existing| existing == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}
