//! Shared application state.

use crate::chat::{EchoReplyGenerator, ReplyGenerator};
use crate::runtime::{build_transcriber, chunk_options, memory_options};
use anyhow::Context;
use helloex_config::HelloexConfig;
use helloex_ingest::Ingestor;
use helloex_memory::{ConversationLog, MemoryStore};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// Default number of messages returned by `/history`.
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// State shared by every request handler.
pub struct AppState {
    pub store: MemoryStore,
    pub ingestor: Ingestor,
    pub history: ConversationLog,
    pub replies: Arc<dyn ReplyGenerator>,
    /// Default `/history` page size.
    pub recent_limit: usize,
    /// Memory log bundled by `/export`, when the file store keeps one.
    pub memory_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(ingestor: Ingestor, history: ConversationLog) -> Self {
        Self {
            store: ingestor.store().clone(),
            ingestor,
            history,
            replies: Arc::new(EchoReplyGenerator),
            recent_limit: DEFAULT_RECENT_LIMIT,
            memory_path: None,
        }
    }

    /// Replace the reply generator.
    pub fn with_replies(mut self, replies: Arc<dyn ReplyGenerator>) -> Self {
        self.replies = replies;
        self
    }

    /// Override the default `/history` page size.
    pub fn with_recent_limit(mut self, recent_limit: usize) -> Self {
        self.recent_limit = recent_limit;
        self
    }

    /// Set the memory log included in exports.
    pub fn with_memory_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.memory_path = Some(path.into());
        self
    }

    /// Build every collaborator from a validated config.
    pub async fn from_config(config: &HelloexConfig) -> anyhow::Result<Self> {
        let store = MemoryStore::open(memory_options(config))
            .await
            .context("failed to open memory store")?;
        let transcriber =
            build_transcriber(&config.transcription).context("failed to build transcriber")?;
        let ingestor = Ingestor::new(store, transcriber, chunk_options(&config.ingest));
        let history = ConversationLog::open(config.history_path())
            .context("failed to open conversation log")?;
        info!(
            "application state ready (backend={}, history={})",
            ingestor.store().backend_name(),
            history.path().display()
        );
        Ok(Self::new(ingestor, history)
            .with_recent_limit(config.history.recent_limit)
            .with_memory_path(config.memory_path()))
    }
}
