//! Vector-database backends reached over HTTP.

mod chroma;
mod qdrant;

pub use chroma::ChromaBackend;
pub use qdrant::QdrantBackend;

use crate::error::MemoryError;
use std::time::Duration;

/// Default request timeout for vector-store calls.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings shared by remote backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOptions {
    /// Base URL of the service, e.g. `http://localhost:6333`.
    pub url: String,
    /// Collection name to create or reuse.
    pub collection: String,
    /// Per-request timeout, connect included.
    pub timeout: Duration,
}

impl RemoteOptions {
    /// Options with the default timeout.
    pub fn new(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            collection: collection.into(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    pub(crate) fn base_url(&self) -> String {
        self.url.trim_end_matches('/').to_string()
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, MemoryError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?)
}

/// Turn a non-success response into a backend error carrying the body.
pub(crate) async fn check_status(
    response: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response, MemoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MemoryError::Backend(format!(
        "{action} failed with status {status}: {body}"
    )))
}
