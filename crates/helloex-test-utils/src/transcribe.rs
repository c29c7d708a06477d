use async_trait::async_trait;
use helloex_ingest::{IngestError, Transcriber, Transcript};

/// Transcriber answering with a caller-chosen text.
#[derive(Debug, Clone)]
pub struct FixedTranscriber {
    text: String,
}

impl FixedTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Transcriber for FixedTranscriber {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn transcribe(&self, _audio: &[u8], _filename: &str) -> Result<Transcript, IngestError> {
        Ok(Transcript {
            text: self.text.clone(),
            confidence: Some(1.0),
            language: Some("en".to_string()),
        })
    }
}

/// Transcriber that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn transcribe(&self, _audio: &[u8], _filename: &str) -> Result<Transcript, IngestError> {
        Err(IngestError::Transcription("transcriber offline".to_string()))
    }
}
