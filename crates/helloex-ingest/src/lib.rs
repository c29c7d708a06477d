//! Ingestion normalizer for helloEx: turns uploaded files into tagged memories.

pub mod error;
pub mod extract;
pub mod kind;
pub mod normalize;
pub mod pipeline;
pub mod transcribe;

/// Ingestion error type.
pub use error::IngestError;
/// JSON chat-export extraction.
pub use extract::extract_json_texts;
/// Upload classification.
pub use kind::IngestKind;
/// Text cleanup and chunking.
pub use normalize::{ChunkOptions, chunk_text, clean_text, decode_lossy};
/// Ingestion pipeline.
pub use pipeline::{IngestOutcome, Ingestor, parse_tag_list};
/// Transcription collaborators.
pub use transcribe::{
    FallbackTranscriber, HttpTranscriber, HttpTranscriberOptions, MockTranscriber, Transcriber,
    Transcript,
};
