//! Error types for memory operations.

/// Errors returned by memory backends and helpers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Transport error talking to an external vector store.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// External backend answered with something unusable.
    #[error("backend error: {0}")]
    Backend(String),
    /// Embedder could not be built.
    #[error("embedder error: {0}")]
    Embedder(String),
    /// Vector length does not match the backend embedder.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
