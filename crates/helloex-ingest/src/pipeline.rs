//! File ingestion into the memory store.

use crate::error::IngestError;
use crate::extract::extract_json_texts;
use crate::kind::IngestKind;
use crate::normalize::{ChunkOptions, chunk_text, clean_text, decode_lossy};
use crate::transcribe::Transcriber;
use helloex_memory::MemoryStore;
use helloex_memory::model::normalize_tags;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Ids produced for one ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub filename: String,
    pub kind: IngestKind,
    #[serde(rename = "embedding_ids")]
    pub ids: Vec<String>,
}

/// Split a comma-separated tag field into trimmed, non-empty labels.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalizes uploads into chunks and stores each chunk as a memory.
#[derive(Clone)]
pub struct Ingestor {
    store: MemoryStore,
    transcriber: Arc<dyn Transcriber>,
    chunking: ChunkOptions,
}

impl Ingestor {
    pub fn new(store: MemoryStore, transcriber: Arc<dyn Transcriber>, chunking: ChunkOptions) -> Self {
        Self {
            store,
            transcriber,
            chunking,
        }
    }

    /// Store backing this ingestor.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Ingest one uploaded file.
    ///
    /// Every chunk is tagged with `tags` followed by `source`. Undecodable or
    /// unsupported content yields an outcome with no ids rather than an error;
    /// only storage failures are returned.
    pub async fn ingest_file(
        &self,
        data: &[u8],
        filename: &str,
        source: Option<&str>,
        tags: &[String],
    ) -> Result<IngestOutcome, IngestError> {
        let kind = IngestKind::from_filename(filename);
        let tags = combined_tags(tags, source);
        debug!(
            "ingesting upload (filename={}, kind={}, bytes={})",
            filename,
            kind,
            data.len()
        );
        let ids = match kind {
            IngestKind::Text | IngestKind::Unknown => {
                self.ingest_text(&decode_lossy(data), &tags).await?
            }
            IngestKind::Json => {
                let mut ids = Vec::new();
                for text in extract_json_texts(&decode_lossy(data)) {
                    ids.extend(self.ingest_text(&text, &tags).await?);
                }
                ids
            }
            IngestKind::Audio => match self.transcriber.transcribe(data, filename).await {
                Ok(transcript) => self.ingest_text(&transcript.text, &tags).await?,
                Err(err) => {
                    warn!(
                        "transcription failed, skipping audio (filename={}, transcriber={}, error={})",
                        filename,
                        self.transcriber.name(),
                        err
                    );
                    Vec::new()
                }
            },
            // OCR is not supported; images produce no memories.
            IngestKind::Image => Vec::new(),
        };
        info!(
            "ingested upload (filename={}, kind={}, chunks={})",
            filename,
            kind,
            ids.len()
        );
        Ok(IngestOutcome {
            filename: filename.to_string(),
            kind,
            ids,
        })
    }

    /// Clean, chunk and store raw text, returning one id per stored chunk.
    pub async fn ingest_text(&self, raw: &str, tags: &[String]) -> Result<Vec<String>, IngestError> {
        let cleaned = clean_text(raw);
        let mut ids = Vec::new();
        for chunk in chunk_text(&cleaned, self.chunking) {
            ids.push(self.store.add(&chunk, tags.to_vec()).await?);
        }
        Ok(ids)
    }
}

fn combined_tags(tags: &[String], source: Option<&str>) -> Vec<String> {
    normalize_tags(tags.iter().map(String::as_str).chain(source))
}
