use super::{RemoteOptions, check_status, http_client};
use crate::embedding::Embedder;
use crate::error::MemoryError;
use crate::model::normalize_tags;
use crate::provider::MemoryBackend;
use crate::rank::Ranked;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Backend storing points in a Qdrant collection through its REST API.
///
/// Point ids are UUIDs; the `mem_` id returned to callers is kept in the
/// payload next to the text and tags.
pub struct QdrantBackend {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    result: CollectionResult,
}

#[derive(Debug, Deserialize)]
struct CollectionResult {
    config: CollectionConfig,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Debug, Deserialize)]
struct VectorParams {
    size: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f32,
    #[serde(default)]
    payload: Option<HitPayload>,
}

#[derive(Debug, Deserialize)]
struct HitPayload {
    #[serde(default)]
    text: Option<String>,
}

impl QdrantBackend {
    /// Connect and make sure the collection exists with cosine distance.
    pub async fn connect(
        options: &RemoteOptions,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, MemoryError> {
        let backend = Self {
            client: http_client(options.timeout)?,
            base_url: options.base_url(),
            collection: options.collection.clone(),
            embedder,
        };
        backend.ensure_collection().await?;
        info!(
            "connected qdrant backend (url={}, collection={}, dimension={})",
            backend.base_url,
            backend.collection,
            backend.embedder.dimension()
        );
        Ok(backend)
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    async fn ensure_collection(&self) -> Result<(), MemoryError> {
        let url = self.collection_url();
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            let info: CollectionInfo = response.json().await?;
            let actual = info.result.config.params.vectors.size;
            let expected = self.embedder.dimension();
            if actual != expected {
                return Err(MemoryError::DimensionMismatch { expected, actual });
            }
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return check_status(response, "qdrant collection lookup")
                .await
                .map(|_| ());
        }
        debug!("creating qdrant collection (name={})", self.collection);
        let body = json!({
            "vectors": { "size": self.embedder.dimension(), "distance": "Cosine" }
        });
        let response = self.client.put(&url).json(&body).send().await?;
        check_status(response, "qdrant collection create").await?;
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for QdrantBackend {
    fn name(&self) -> &'static str {
        "qdrant"
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn add(&self, text: &str, tags: Vec<String>) -> Result<String, MemoryError> {
        let point_id = Uuid::new_v4();
        let memory_id = format!("mem_{}", point_id.simple());
        let body = json!({
            "points": [{
                "id": point_id.to_string(),
                "vector": self.embedder.embed(text),
                "payload": {
                    "memory_id": memory_id,
                    "text": text,
                    "tags": normalize_tags(tags),
                }
            }]
        });
        let url = format!("{}/points?wait=true", self.collection_url());
        let response = self.client.put(&url).json(&body).send().await?;
        check_status(response, "qdrant upsert").await?;
        debug!("stored qdrant point (id={memory_id})");
        Ok(memory_id)
    }

    async fn retrieve_scored(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Ranked<String>>, MemoryError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let body = json!({
            "vector": self.embedder.embed(query),
            "limit": top_k,
            "with_payload": true,
        });
        let url = format!("{}/points/search", self.collection_url());
        let response = self.client.post(&url).json(&body).send().await?;
        let response: SearchResponse = check_status(response, "qdrant search")
            .await?
            .json()
            .await?;
        Ok(response
            .result
            .into_iter()
            .filter_map(|hit| {
                let text = hit.payload.and_then(|payload| payload.text)?;
                Some(Ranked {
                    item: text,
                    score: hit.score,
                })
            })
            .take(top_k)
            .collect())
    }
}
