//! Memory storage and similarity recall for helloEx.

pub mod embedding;
pub mod error;
pub mod history;
pub mod model;
pub mod provider;
pub mod rank;
pub mod remote;
pub mod store;

/// Embedders and embedder selection.
#[cfg(feature = "model")]
pub use embedding::ModelEmbedder;
pub use embedding::{
    Embedder, EmbedderKind, HashingEmbedder, SUPPORTED_MODELS, ToyEmbedder, build_embedder,
    model_dimension,
};
/// Memory error type.
pub use error::MemoryError;
/// Conversation log.
pub use history::{ConversationLog, ConversationMessage, Role};
/// Memory record model.
pub use model::MemoryRecord;
/// Backend interface and the default file implementation.
pub use provider::{FileMemoryBackend, MemoryBackend};
/// Ranking helpers.
pub use rank::{Ranked, cosine_similarity, rank_top_k};
/// Remote vector-store backends.
pub use remote::{ChromaBackend, QdrantBackend, RemoteOptions};
/// Backend selection facade.
pub use store::{BackendSpec, MemoryStore, MemoryStoreOptions};
