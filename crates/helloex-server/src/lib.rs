//! HTTP surface for helloEx.
//!
//! # Endpoints
//!
//! - `GET /health` - liveness plus the active memory backend
//! - `POST /memory/upload` - store one memory
//! - `POST /memory/retrieve` - similarity recall
//! - `POST /ingest/upload` - multipart file ingestion
//! - `POST /chat` - persona reply grounded in recalled memories
//! - `GET /history` - recent conversation messages
//! - `GET /export` - zip of the memory and conversation logs

pub mod chat;
pub mod error;
pub mod routes;
pub mod runtime;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub use chat::{EchoReplyGenerator, Reply, ReplyGenerator, build_prompt};
pub use error::{ApiError, ReplyError};
pub use state::AppState;

/// Upper bound for request bodies, sized for audio uploads.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Create the router with every route and the CORS layer.
pub fn create_router(state: Arc<AppState>, cors_allow_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/memory/upload", post(routes::memory_upload))
        .route("/memory/retrieve", post(routes::memory_retrieve))
        .route("/ingest/upload", post(routes::ingest_upload))
        .route("/chat", post(routes::chat))
        .route("/history", get(routes::history))
        .route("/export", get(routes::export))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(cors_allow_origins))
        .with_state(state)
}

/// `"*"` anywhere in the list allows every origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin (origin={})", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    cors_allow_origins: &[String],
) -> anyhow::Result<()> {
    let router = create_router(state, cors_allow_origins);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("helloex server listening (addr={})", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
