//! Speech-to-text collaborator used for audio uploads.

use crate::error::IngestError;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Default request timeout for transcription calls.
pub const DEFAULT_TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of transcribing an audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub confidence: Option<f32>,
    pub language: Option<String>,
}

#[async_trait]
/// Turns audio bytes into text.
pub trait Transcriber: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &'static str;

    /// Transcribe one clip. `filename` is passed through for format sniffing.
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<Transcript, IngestError>;
}

/// Offline transcriber returning a fixed transcript.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTranscriber;

impl MockTranscriber {
    pub const TEXT: &'static str = "I still miss our late-night calls.";
    pub const CONFIDENCE: f32 = 0.97;
    pub const LANGUAGE: &'static str = "en";
}

#[async_trait]
impl Transcriber for MockTranscriber {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<Transcript, IngestError> {
        debug!(
            "mock transcription (filename={}, bytes={})",
            filename,
            audio.len()
        );
        Ok(Transcript {
            text: Self::TEXT.to_string(),
            confidence: Some(Self::CONFIDENCE),
            language: Some(Self::LANGUAGE.to_string()),
        })
    }
}

/// Settings for [`HttpTranscriber`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTranscriberOptions {
    /// API base, e.g. `http://localhost:8000/v1`.
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

impl HttpTranscriber {
    pub fn new(options: HttpTranscriberOptions) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;
        let endpoint = format!(
            "{}/audio/transcriptions",
            options.url.trim_end_matches('/')
        );
        info!(
            "configured http transcriber (endpoint={}, model={})",
            endpoint, options.model
        );
        Ok(Self {
            client,
            endpoint,
            api_key: options.api_key,
            model: options.model,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<Transcript, IngestError> {
        let form = Form::new()
            .part(
                "file",
                Part::bytes(audio.to_vec()).file_name(filename.to_string()),
            )
            .text("model", self.model.clone())
            .text("response_format", "json");
        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Transcription(format!(
                "endpoint returned {status}: {body}"
            )));
        }
        let body: TranscriptionResponse = response.json().await?;
        debug!(
            "http transcription complete (filename={}, chars={})",
            filename,
            body.text.len()
        );
        Ok(Transcript {
            text: body.text.trim().to_string(),
            confidence: None,
            language: body.language,
        })
    }
}

/// Tries `primary` once and answers with `fallback` when it fails.
pub struct FallbackTranscriber {
    primary: Arc<dyn Transcriber>,
    fallback: Arc<dyn Transcriber>,
}

impl FallbackTranscriber {
    pub fn new(primary: Arc<dyn Transcriber>, fallback: Arc<dyn Transcriber>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Transcriber for FallbackTranscriber {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<Transcript, IngestError> {
        match self.primary.transcribe(audio, filename).await {
            Ok(transcript) => Ok(transcript),
            Err(err) => {
                warn!(
                    "transcriber failed, using fallback (primary={}, fallback={}, error={})",
                    self.primary.name(),
                    self.fallback.name(),
                    err
                );
                self.fallback.transcribe(audio, filename).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FallbackTranscriber, MockTranscriber, Transcriber};
    use crate::error::IngestError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Broken;

    #[async_trait]
    impl Transcriber for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn transcribe(&self, _audio: &[u8], _filename: &str) -> Result<super::Transcript, IngestError> {
            Err(IngestError::Transcription("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn mock_returns_fixed_transcript() {
        let transcript = MockTranscriber.transcribe(b"RIFF", "a.wav").await.expect("transcript");
        assert_eq!(transcript.text, "I still miss our late-night calls.");
        assert_eq!(transcript.confidence, Some(0.97));
        assert_eq!(transcript.language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn fallback_is_used_once_on_failure() {
        let transcriber = FallbackTranscriber::new(Arc::new(Broken), Arc::new(MockTranscriber));
        let transcript = transcriber.transcribe(b"", "a.ogg").await.expect("transcript");
        assert_eq!(transcript.text, MockTranscriber::TEXT);
        assert_eq!(transcriber.name(), "broken");
    }
}
