//! Backend selection and the facade used by ingestion and the HTTP layer.

use crate::embedding::{Embedder, EmbedderKind, build_embedder};
use crate::error::MemoryError;
use crate::provider::{FileMemoryBackend, MemoryBackend};
use crate::rank::Ranked;
use crate::remote::{ChromaBackend, QdrantBackend, RemoteOptions};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Default number of memories returned by a retrieval.
pub const DEFAULT_TOP_K: usize = 5;

/// Which storage target to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSpec {
    /// JSONL log at the given path.
    File { path: PathBuf },
    /// Qdrant collection.
    Qdrant(RemoteOptions),
    /// Chroma collection.
    Chroma(RemoteOptions),
}

/// Options for [`MemoryStore::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStoreOptions {
    /// Preferred backend.
    pub backend: BackendSpec,
    /// Log used when the preferred backend cannot be initialized.
    pub fallback_path: PathBuf,
    /// Embedder shared by every backend.
    pub embedder: EmbedderKind,
    /// Retrieval size when the caller does not pass one.
    pub default_top_k: usize,
}

impl MemoryStoreOptions {
    /// File-backed options with the toy embedder.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            backend: BackendSpec::File { path: path.clone() },
            fallback_path: path,
            embedder: EmbedderKind::Toy,
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

/// Facade over exactly one [`MemoryBackend`], chosen at construction.
#[derive(Clone)]
pub struct MemoryStore {
    backend: Arc<dyn MemoryBackend>,
    fallback_reason: Option<String>,
    default_top_k: usize,
}

impl MemoryStore {
    /// Build the configured backend, falling back to the file backend once
    /// if it fails to initialize.
    pub async fn open(options: MemoryStoreOptions) -> Result<Self, MemoryError> {
        let embedder = build_embedder(&options.embedder)?;
        let attempt = connect(&options.backend, embedder.clone()).await;
        let (backend, fallback_reason) = match attempt {
            Ok(backend) => (backend, None),
            Err(err) => {
                let reason = format!("{} backend unavailable: {err}", spec_name(&options.backend));
                warn!(
                    "memory backend init failed, using file fallback (reason={}, path={})",
                    reason,
                    options.fallback_path.display()
                );
                let fallback: Arc<dyn MemoryBackend> =
                    Arc::new(FileMemoryBackend::open(&options.fallback_path, embedder)?);
                (fallback, Some(reason))
            }
        };
        info!(
            "memory store ready (backend={}, dimension={}, top_k={})",
            backend.name(),
            backend.dimension(),
            options.default_top_k
        );
        Ok(Self {
            backend,
            fallback_reason,
            default_top_k: options.default_top_k.max(1),
        })
    }

    /// Wrap an already constructed backend.
    pub fn from_backend(backend: Arc<dyn MemoryBackend>, default_top_k: usize) -> Self {
        Self {
            backend,
            fallback_reason: None,
            default_top_k: default_top_k.max(1),
        }
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Why the configured backend was replaced, if it was.
    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    /// Retrieval size used when none is requested.
    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Store a memory and return its id.
    pub async fn add(&self, text: &str, tags: Vec<String>) -> Result<String, MemoryError> {
        self.backend.add(text, tags).await
    }

    /// Retrieve up to `top_k` (or the default) texts, best first.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<String>, MemoryError> {
        self.backend
            .retrieve(query, top_k.unwrap_or(self.default_top_k))
            .await
    }

    /// Retrieve with scores.
    pub async fn retrieve_scored(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<Ranked<String>>, MemoryError> {
        self.backend
            .retrieve_scored(query, top_k.unwrap_or(self.default_top_k))
            .await
    }

    /// Best-effort retrieval: backend errors are logged and yield no memories.
    pub async fn retrieve_or_empty(&self, query: &str, top_k: Option<usize>) -> Vec<String> {
        match self.retrieve(query, top_k).await {
            Ok(results) => results,
            Err(err) => {
                warn!(
                    "memory retrieval failed, continuing without context (backend={}, error={})",
                    self.backend.name(),
                    err
                );
                Vec::new()
            }
        }
    }
}

fn spec_name(spec: &BackendSpec) -> &'static str {
    match spec {
        BackendSpec::File { .. } => "file",
        BackendSpec::Qdrant(_) => "qdrant",
        BackendSpec::Chroma(_) => "chroma",
    }
}

async fn connect(
    spec: &BackendSpec,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn MemoryBackend>, MemoryError> {
    debug!("connecting memory backend (kind={})", spec_name(spec));
    Ok(match spec {
        BackendSpec::File { path } => Arc::new(FileMemoryBackend::open(path, embedder)?),
        BackendSpec::Qdrant(options) => Arc::new(QdrantBackend::connect(options, embedder).await?),
        BackendSpec::Chroma(options) => Arc::new(ChromaBackend::connect(options, embedder).await?),
    })
}
