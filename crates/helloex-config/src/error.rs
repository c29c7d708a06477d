//! Config error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON5.
    #[error("config syntax error: {0}")]
    Syntax(#[from] json5::Error),
    /// Merged JSON did not match the config model.
    #[error("config decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// Schema violation at a dotted path, e.g. `memory.qdrant.url`.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}
