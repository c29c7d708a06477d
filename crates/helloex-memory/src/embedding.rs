//! Deterministic text embedders.
//!
//! Every embedder maps text to a vector of a fixed length. Backends embed both
//! stored texts and queries with the same instance, so the only hard contract
//! is determinism and a stable dimension.
//!
//! [`ToyEmbedder`] and [`HashingEmbedder`] are always available. The
//! fastembed-backed `ModelEmbedder` is compiled in with the `model` feature.

use crate::error::MemoryError;
use std::sync::Arc;

#[cfg(feature = "model")]
pub use self::model::ModelEmbedder;

/// Dimension of the [`ToyEmbedder`] output: 26 letter counts plus a length scalar.
pub const TOY_DIMENSION: usize = 27;

/// Default bucket count for the [`HashingEmbedder`].
pub const DEFAULT_HASHING_DIMENSION: usize = 256;

/// Text embedder abstraction.
pub trait Embedder: Send + Sync {
    /// Identifier used in logs and config.
    fn name(&self) -> &'static str;

    /// Length of every vector returned by [`Embedder::embed`].
    fn dimension(&self) -> usize;

    /// Embed text. Must be pure: the same text always yields the same vector.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Letter-frequency embedder.
///
/// Counts case-insensitive ASCII letters and appends `min(len / 100, 1)`
/// where `len` is the character length of the lowercased text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToyEmbedder;

impl Embedder for ToyEmbedder {
    fn name(&self) -> &'static str {
        "toy"
    }

    fn dimension(&self) -> usize {
        TOY_DIMENSION
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut vector = vec![0.0f32; TOY_DIMENSION];
        let mut len = 0usize;
        for ch in lowered.chars() {
            len += 1;
            if ch.is_ascii_lowercase() {
                vector[(ch as u8 - b'a') as usize] += 1.0;
            }
        }
        vector[TOY_DIMENSION - 1] = (len as f32 / 100.0).min(1.0);
        vector
    }
}

/// Signed feature-hashing bag-of-words embedder.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create an embedder with `dimension` buckets (at least one).
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

impl Embedder for HashingEmbedder {
    fn name(&self) -> &'static str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

/// 64-bit FNV-1a; fixed constants keep vectors stable across builds.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Sentence-embedding models the `model` embedder can load, with their output size.
pub const SUPPORTED_MODELS: &[(&str, usize)] = &[
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
    ("bge-large-en-v1.5", 1024),
    ("nomic-embed-text-v1.5", 768),
    ("multilingual-e5-small", 384),
    ("multilingual-e5-base", 768),
];

/// Output size of a supported model, or `None` for unknown names.
pub fn model_dimension(name: &str) -> Option<usize> {
    SUPPORTED_MODELS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, dimension)| *dimension)
}

/// Embedder selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedderKind {
    /// [`ToyEmbedder`].
    Toy,
    /// [`HashingEmbedder`] with the given dimension.
    Hashing { dimension: usize },
    /// Local fastembed model, one of [`SUPPORTED_MODELS`].
    Model { name: String },
}

/// Construct the embedder for a kind.
///
/// Only [`EmbedderKind::Model`] can fail: the name may be unknown, the model
/// may not download, or the crate may be built without the `model` feature.
pub fn build_embedder(kind: &EmbedderKind) -> Result<Arc<dyn Embedder>, MemoryError> {
    Ok(match kind {
        EmbedderKind::Toy => Arc::new(ToyEmbedder),
        EmbedderKind::Hashing { dimension } => Arc::new(HashingEmbedder::new(*dimension)),
        EmbedderKind::Model { name } => load_model(name)?,
    })
}

#[cfg(feature = "model")]
fn load_model(name: &str) -> Result<Arc<dyn Embedder>, MemoryError> {
    Ok(Arc::new(ModelEmbedder::load(name)?))
}

#[cfg(not(feature = "model"))]
fn load_model(name: &str) -> Result<Arc<dyn Embedder>, MemoryError> {
    Err(MemoryError::Embedder(format!(
        "embedding model {name:?} requested but this build lacks the `model` feature"
    )))
}

#[cfg(feature = "model")]
mod model {
    use super::{Embedder, model_dimension};
    use crate::error::MemoryError;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use log::{info, warn};
    use parking_lot::Mutex;

    /// Embedder backed by a local ONNX sentence-embedding model.
    ///
    /// The model is loaded (and downloaded on first use) by [`ModelEmbedder::load`].
    /// Inference needs `&mut`, so calls are serialized through a mutex.
    pub struct ModelEmbedder {
        name: String,
        dimension: usize,
        model: Mutex<TextEmbedding>,
    }

    pub(super) fn fastembed_model(name: &str) -> Option<EmbeddingModel> {
        Some(match name {
            "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
            "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
            "nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
            "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
            "multilingual-e5-base" => EmbeddingModel::MultilingualE5Base,
            _ => return None,
        })
    }

    impl ModelEmbedder {
        /// Load a model from [`super::SUPPORTED_MODELS`].
        pub fn load(name: &str) -> Result<Self, MemoryError> {
            let (Some(model), Some(dimension)) = (fastembed_model(name), model_dimension(name))
            else {
                return Err(MemoryError::Embedder(format!(
                    "unknown embedding model: {name:?}"
                )));
            };
            info!("loading embedding model (model={}, dimension={})", name, dimension);
            let model = TextEmbedding::try_new(InitOptions::new(model)).map_err(|err| {
                MemoryError::Embedder(format!("failed to load model {name:?}: {err}"))
            })?;
            Ok(Self {
                name: name.to_string(),
                dimension,
                model: Mutex::new(model),
            })
        }

        /// Name the model was loaded under.
        pub fn model_name(&self) -> &str {
            &self.name
        }
    }

    impl Embedder for ModelEmbedder {
        fn name(&self) -> &'static str {
            "model"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        /// Inference failures yield a zero vector, which scores 0 against everything.
        fn embed(&self, text: &str) -> Vec<f32> {
            let result = self.model.lock().embed(vec![text], None);
            match result {
                Ok(vectors) => match vectors.into_iter().next() {
                    Some(vector) if vector.len() == self.dimension => vector,
                    other => {
                        warn!(
                            "embedding model returned an unexpected vector (model={}, len={:?})",
                            self.name,
                            other.map(|vector| vector.len())
                        );
                        vec![0.0; self.dimension]
                    }
                },
                Err(err) => {
                    warn!("embedding failed (model={}, error={})", self.name, err);
                    vec![0.0; self.dimension]
                }
            }
        }
    }
}
