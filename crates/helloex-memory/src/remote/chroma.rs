use super::{RemoteOptions, check_status, http_client};
use crate::embedding::Embedder;
use crate::error::MemoryError;
use crate::model::{new_memory_id, normalize_tags};
use crate::provider::MemoryBackend;
use crate::rank::Ranked;
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Backend storing documents in a Chroma collection via the v1 REST API.
///
/// Chroma reports cosine distance; scores are returned as `1 - distance`.
/// The embedder dimension is stored in the collection metadata under
/// [`DIMENSION_METADATA_KEY`] so a reused collection can be checked on connect.
pub struct ChromaBackend {
    client: reqwest::Client,
    base_url: String,
    collection_id: String,
    embedder: Arc<dyn Embedder>,
}

/// Collection metadata key recording the vector dimension.
pub const DIMENSION_METADATA_KEY: &str = "helloex:dimension";

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
    /// Set by Chroma once the collection holds embeddings.
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl CollectionResponse {
    fn known_dimension(&self) -> Option<usize> {
        self.dimension.or_else(|| {
            self.metadata
                .as_ref()?
                .get(DIMENSION_METADATA_KEY)?
                .as_u64()
                .map(|size| size as usize)
        })
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

impl ChromaBackend {
    /// Connect, creating the collection when it does not exist yet.
    pub async fn connect(
        options: &RemoteOptions,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, MemoryError> {
        let client = http_client(options.timeout)?;
        let base_url = options.base_url();
        let body = json!({
            "name": options.collection,
            "get_or_create": true,
            "metadata": {
                "hnsw:space": "cosine",
                DIMENSION_METADATA_KEY: embedder.dimension(),
            },
        });
        let response = client
            .post(format!("{base_url}/api/v1/collections"))
            .json(&body)
            .send()
            .await?;
        let collection: CollectionResponse = check_status(response, "chroma collection create")
            .await?
            .json()
            .await?;
        let expected = embedder.dimension();
        if let Some(actual) = collection.known_dimension() {
            if actual != expected {
                return Err(MemoryError::DimensionMismatch { expected, actual });
            }
        }
        info!(
            "connected chroma backend (url={}, collection={}, id={})",
            base_url, options.collection, collection.id
        );
        Ok(Self {
            client,
            base_url,
            collection_id: collection.id,
            embedder,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/api/v1/collections/{}", self.base_url, self.collection_id)
    }
}

#[async_trait]
impl MemoryBackend for ChromaBackend {
    fn name(&self) -> &'static str {
        "chroma"
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn add(&self, text: &str, tags: Vec<String>) -> Result<String, MemoryError> {
        let id = new_memory_id();
        let body = json!({
            "ids": [id],
            "embeddings": [self.embedder.embed(text)],
            "documents": [text],
            "metadatas": [{ "tags": normalize_tags(tags).join(",") }],
        });
        let response = self
            .client
            .post(format!("{}/add", self.collection_url()))
            .json(&body)
            .send()
            .await?;
        check_status(response, "chroma add").await?;
        debug!("stored chroma document (id={id})");
        Ok(id)
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
            "query_embeddings": [self.embedder.embed(query)],
            "n_results": top_k,
            "include": ["documents", "distances"],
        });
        let response = self
            .client
            .post(format!("{}/query", self.collection_url()))
            .json(&body)
            .send()
            .await?;
        let response: QueryResponse = check_status(response, "chroma query").await?.json().await?;
        let documents = response.documents.into_iter().next().unwrap_or_default();
        let distances = response
            .distances
            .and_then(|rows| rows.into_iter().next())
            .unwrap_or_default();
        Ok(documents
            .into_iter()
            .enumerate()
            .filter_map(|(idx, document)| {
                let text = document?;
                let distance = distances.get(idx).copied().unwrap_or(1.0);
                Some(Ranked {
                    item: text,
                    score: 1.0 - distance,
                })
            })
            .take(top_k)
            .collect())
    }
}
