//! Configuration schema for helloEx.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root config for the helloEx service.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HelloexConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl HelloexConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> HelloexConfigBuilder {
        HelloexConfigBuilder::new()
    }

    /// Absolute or cwd-relative data directory.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    /// Memory log path, defaulting to `<data_dir>/memory.jsonl`.
    pub fn memory_path(&self) -> PathBuf {
        resolve_in(&self.data_dir(), self.memory.path.as_deref(), "memory.jsonl")
    }

    /// Conversation log path, defaulting to `<data_dir>/messages.jsonl`.
    pub fn history_path(&self) -> PathBuf {
        resolve_in(&self.data_dir(), self.history.path.as_deref(), "messages.jsonl")
    }
}

fn resolve_in(data_dir: &Path, configured: Option<&str>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) => PathBuf::from(path),
        None => data_dir.join(default_name),
    }
}

/// Builder for assembling a `HelloexConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct HelloexConfigBuilder {
    config: HelloexConfig,
}

impl HelloexConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: HelloexConfig::default(),
        }
    }

    /// Replace the HTTP server configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Point storage at a data directory.
    pub fn data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.config.storage.data_dir = data_dir.as_ref().display().to_string();
        self
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the ingestion configuration.
    pub fn ingest(mut self, ingest: IngestConfig) -> Self {
        self.config.ingest = ingest;
        self
    }

    /// Replace the transcription configuration.
    pub fn transcription(mut self, transcription: TranscriptionConfig) -> Self {
        self.config.transcription = transcription;
        self
    }

    /// Replace the conversation history configuration.
    pub fn history(mut self, history: HistoryConfig) -> Self {
        self.config.history = history;
        self
    }

    /// Finalize and return the built `HelloexConfig`.
    pub fn build(self) -> HelloexConfig {
        self.config
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_allow_origins")]
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_allow_origins: default_cors_allow_origins(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_cors_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// On-disk storage locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data/storage".to_string()
}

/// Memory backend selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendKind {
    /// Flat JSONL file with in-process cosine search.
    #[default]
    File,
    /// Qdrant REST API.
    Qdrant,
    /// Chroma REST API.
    Chroma,
}

/// Embedder selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderName {
    /// Letter-frequency embedder with 27 dimensions.
    #[default]
    Toy,
    /// Feature-hashing embedder using `memory.dimension`.
    Hashing,
    /// Local sentence-embedding model named by `memory.model`.
    /// Needs a server built with the `model` feature.
    Model,
}

/// Memory store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackendKind,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub embedder: EmbedderName,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub qdrant: VectorStoreConfig,
    #[serde(default)]
    pub chroma: VectorStoreConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackendKind::default(),
            path: None,
            embedder: EmbedderName::default(),
            dimension: default_dimension(),
            model: default_model(),
            top_k: default_top_k(),
            qdrant: VectorStoreConfig::default(),
            chroma: VectorStoreConfig::default(),
        }
    }
}

/// Default hashing embedder dimension.
fn default_dimension() -> usize {
    256
}

fn default_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

/// Default number of memories to retrieve.
fn default_top_k() -> usize {
    5
}

/// Connection settings for an external vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_vector_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            collection: default_collection(),
            timeout_ms: default_vector_store_timeout_ms(),
        }
    }
}

fn default_collection() -> String {
    "helloex_memories".to_string()
}

fn default_vector_store_timeout_ms() -> u64 {
    5_000
}

/// Chunking parameters for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "default_min_break_offset")]
    pub min_break_offset: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            min_break_offset: default_min_break_offset(),
        }
    }
}

fn default_max_chunk_chars() -> usize {
    800
}

fn default_min_break_offset() -> usize {
    200
}

/// Transcription collaborator selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionMode {
    /// Fixed transcript, no network.
    #[default]
    Mock,
    /// OpenAI-compatible `/audio/transcriptions` endpoint.
    Http,
}

/// Transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub mode: TranscriptionMode,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    #[serde(default = "default_transcription_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            mode: TranscriptionMode::default(),
            url: None,
            api_key: None,
            model: default_transcription_model(),
            timeout_ms: default_transcription_timeout_ms(),
        }
    }
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_transcription_timeout_ms() -> u64 {
    60_000
}

/// Conversation log configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            recent_limit: default_recent_limit(),
        }
    }
}

/// Default number of messages returned by history queries.
fn default_recent_limit() -> usize {
    20
}
