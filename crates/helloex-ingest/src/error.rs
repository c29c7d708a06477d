//! Error types for ingestion.

use helloex_memory::MemoryError;

/// Errors returned by the ingestion pipeline and transcribers.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Storing a chunk failed.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// The transcription collaborator failed or answered badly.
    #[error("transcription failed: {0}")]
    Transcription(String),
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Transcription(err.to_string())
    }
}
