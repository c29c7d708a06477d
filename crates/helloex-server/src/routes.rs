//! Request handlers.

use crate::chat::{DEFAULT_PERSONA, build_prompt};
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use helloex_ingest::{IngestOutcome, parse_tag_list};
use helloex_memory::{ConversationMessage, Role};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use zip::ZipWriter;
use zip::write::FileOptions;

/// Memories pulled into every chat prompt.
pub const CHAT_CONTEXT_MEMORIES: usize = 5;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub fallback: Option<String>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        backend: state.store.backend_name().to_string(),
        fallback: state.store.fallback_reason().map(str::to_string),
    })
}

#[derive(Debug, Deserialize)]
pub struct MemoryUploadRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryUploadResponse {
    pub status: String,
    pub embedding_id: String,
}

/// Store one memory verbatim.
pub async fn memory_upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MemoryUploadRequest>,
) -> Result<Json<MemoryUploadResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    let id = state.store.add(&request.text, request.tags).await?;
    debug!("memory uploaded (id={})", id);
    Ok(Json(MemoryUploadResponse {
        status: "stored".to_string(),
        embedding_id: id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MemoryRetrieveRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryRetrieveResponse {
    pub results: Vec<String>,
}

pub async fn memory_retrieve(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MemoryRetrieveRequest>,
) -> Result<Json<MemoryRetrieveResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("query is required"));
    }
    let results = state.store.retrieve(&request.query, request.top_k).await?;
    Ok(Json(MemoryRetrieveResponse { results }))
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub total_files: usize,
    pub total_embeddings: usize,
    pub items: Vec<IngestOutcome>,
}

/// Multipart upload: repeated `files` parts plus optional `source` and `tags`.
///
/// Text fields may arrive after the files, so parts are buffered before any
/// file is ingested.
pub async fn ingest_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let mut files = Vec::new();
    let mut source: Option<String> = None;
    let mut tags = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("invalid multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::bad_request(format!("failed to read {filename}: {err}")))?;
                files.push((filename, data));
            }
            "source" | "tags" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ApiError::bad_request(format!("invalid {name} field: {err}")))?;
                if name == "source" {
                    let value = value.trim();
                    source = (!value.is_empty()).then(|| value.to_string());
                } else {
                    tags = parse_tag_list(&value);
                }
            }
            other => debug!("ignoring multipart field (name={})", other),
        }
    }
    if files.is_empty() {
        return Err(ApiError::bad_request("at least one file is required"));
    }

    let mut items = Vec::with_capacity(files.len());
    for (filename, data) in &files {
        let outcome = state
            .ingestor
            .ingest_file(data, filename, source.as_deref(), &tags)
            .await?;
        items.push(outcome);
    }
    let total_embeddings = items.iter().map(|item| item.ids.len()).sum();
    info!(
        "ingest upload finished (files={}, embeddings={})",
        items.len(),
        total_embeddings
    );
    Ok(Json(IngestResponse {
        total_files: items.len(),
        total_embeddings,
        items,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub persona: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply_text: String,
    pub sentiment: Option<String>,
    pub memories_used: Vec<String>,
}

/// Log the message, recall context, generate and log the reply.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message is required"));
    }
    state.history.append(Role::User, &request.message)?;
    let memories = state
        .store
        .retrieve_or_empty(&request.message, Some(CHAT_CONTEXT_MEMORIES))
        .await;
    let persona = request
        .persona
        .as_deref()
        .map(str::trim)
        .filter(|persona| !persona.is_empty())
        .unwrap_or(DEFAULT_PERSONA);
    let prompt = build_prompt(persona, &memories, &request.message);
    let reply = state.replies.generate(&prompt).await?;
    state.history.append(Role::Assistant, &reply.text)?;
    debug!(
        "chat reply generated (generator={}, memories={})",
        state.replies.name(),
        memories.len()
    );
    Ok(Json(ChatResponse {
        reply_text: reply.text,
        sentiment: reply.sentiment,
        memories_used: memories,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<ConversationMessage>,
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(state.recent_limit);
    let messages = state.history.recent(limit)?;
    Ok(Json(HistoryResponse { messages }))
}

/// Download the memory and conversation logs as one zip archive.
///
/// Logs that were never written are left out; `report.txt` is always present.
pub async fn export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let mut logs = Vec::new();
    if let Some(path) = state.memory_path.as_deref() {
        logs.push(path);
    }
    logs.push(state.history.path());
    let bytes = build_export(&logs)?;
    info!("export built (bytes={}, logs={})", bytes.len(), logs.len());
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=helloex_export.zip",
            ),
        ],
        bytes,
    ))
}

fn build_export(logs: &[&Path]) -> zip::result::ZipResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for path in logs {
            if !path.is_file() {
                debug!("export skipping missing log (path={})", path.display());
                continue;
            }
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "log.jsonl".to_string());
            zip.start_file(name, options)?;
            zip.write_all(&std::fs::read(path)?)?;
        }
        zip.start_file("report.txt", options)?;
        let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(zip, "helloEx export generated at {generated}")?;
        zip.finish()?;
    }
    Ok(buf)
}
