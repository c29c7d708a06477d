//! Config to runtime mapping.

use helloex_config::{
    EmbedderName, HelloexConfig, IngestConfig, MemoryBackendKind, TranscriptionConfig,
    TranscriptionMode, VectorStoreConfig,
};
use helloex_ingest::{
    ChunkOptions, FallbackTranscriber, HttpTranscriber, HttpTranscriberOptions, IngestError,
    MockTranscriber, Transcriber,
};
use helloex_memory::{BackendSpec, EmbedderKind, MemoryStoreOptions, RemoteOptions};
use std::sync::Arc;
use std::time::Duration;

/// Translate the memory section into store options.
pub fn memory_options(config: &HelloexConfig) -> MemoryStoreOptions {
    let memory = &config.memory;
    let fallback_path = config.memory_path();
    let backend = match memory.backend {
        MemoryBackendKind::File => BackendSpec::File {
            path: fallback_path.clone(),
        },
        MemoryBackendKind::Qdrant => BackendSpec::Qdrant(remote_options(&memory.qdrant)),
        MemoryBackendKind::Chroma => BackendSpec::Chroma(remote_options(&memory.chroma)),
    };
    let embedder = match memory.embedder {
        EmbedderName::Toy => EmbedderKind::Toy,
        EmbedderName::Hashing => EmbedderKind::Hashing {
            dimension: memory.dimension,
        },
        EmbedderName::Model => EmbedderKind::Model {
            name: memory.model.trim().to_string(),
        },
    };
    MemoryStoreOptions {
        backend,
        fallback_path,
        embedder,
        default_top_k: memory.top_k,
    }
}

fn remote_options(config: &VectorStoreConfig) -> RemoteOptions {
    RemoteOptions {
        url: config.url.clone().unwrap_or_default(),
        collection: config.collection.clone(),
        timeout: Duration::from_millis(config.timeout_ms),
    }
}

/// Translate the ingest section into chunking options.
pub fn chunk_options(config: &IngestConfig) -> ChunkOptions {
    ChunkOptions {
        max_chars: config.max_chunk_chars,
        min_break: config.min_break_offset,
    }
}

/// Build the configured transcriber. The HTTP client falls back to the mock.
pub fn build_transcriber(
    config: &TranscriptionConfig,
) -> Result<Arc<dyn Transcriber>, IngestError> {
    match config.mode {
        TranscriptionMode::Mock => Ok(Arc::new(MockTranscriber)),
        TranscriptionMode::Http => {
            let http = HttpTranscriber::new(HttpTranscriberOptions {
                url: config.url.clone().unwrap_or_default(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                timeout: Duration::from_millis(config.timeout_ms),
            })?;
            Ok(Arc::new(FallbackTranscriber::new(
                Arc::new(http),
                Arc::new(MockTranscriber),
            )))
        }
    }
}
