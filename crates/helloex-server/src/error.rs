//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use helloex_ingest::IngestError;
use helloex_memory::MemoryError;
use log::error;
use serde::Serialize;

/// Error body rendered for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Request failure, rendered as `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller input was rejected.
    #[error("{0}")]
    BadRequest(String),
    /// Something failed on our side.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed (status={}, error={})", status, self);
        }
        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<MemoryError> for ApiError {
    fn from(err: MemoryError) -> Self {
        ApiError::Internal(format!("memory store error: {err}"))
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        ApiError::Internal(format!("ingestion error: {err}"))
    }
}

/// Failure reported by a reply generator.
#[derive(Debug, thiserror::Error)]
#[error("reply generation failed: {0}")]
pub struct ReplyError(pub String);

impl From<ReplyError> for ApiError {
    fn from(err: ReplyError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<zip::result::ZipError> for ApiError {
    fn from(err: zip::result::ZipError) -> Self {
        ApiError::Internal(format!("export failed: {err}"))
    }
}
