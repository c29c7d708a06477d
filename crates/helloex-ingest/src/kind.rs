//! Upload classification by file extension.

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Ingestion path chosen for an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestKind {
    Text,
    Json,
    Audio,
    Image,
    /// Unrecognized extension, decoded as text.
    Unknown,
}

impl IngestKind {
    /// Classify a filename by its lowercased extension.
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("txt" | "md") => Self::Text,
            Some("json") => Self::Json,
            Some("wav" | "mp3" | "m4a" | "ogg") => Self::Audio,
            Some("png" | "jpg" | "jpeg" | "webp") => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IngestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
