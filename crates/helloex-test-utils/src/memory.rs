use async_trait::async_trait;
use helloex_memory::{MemoryBackend, MemoryError, Ranked};
use parking_lot::Mutex;

/// Backend that remembers every add and answers retrievals from a fixed list.
#[derive(Default)]
pub struct RecordingBackend {
    added: Mutex<Vec<(String, Vec<String>)>>,
    recall: Vec<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recall(recall: Vec<String>) -> Self {
        Self {
            added: Mutex::new(Vec::new()),
            recall,
        }
    }

    /// `(text, tags)` pairs in the order they were added.
    pub fn added(&self) -> Vec<(String, Vec<String>)> {
        self.added.lock().clone()
    }
}

#[async_trait]
impl MemoryBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn dimension(&self) -> usize {
        0
    }

    async fn add(&self, text: &str, tags: Vec<String>) -> Result<String, MemoryError> {
        let mut added = self.added.lock();
        added.push((text.to_string(), tags));
        Ok(format!("mem_{:032x}", added.len()))
    }

    async fn retrieve_scored(
        &self,
        _query: &str,
        top_k: usize,
    ) -> Result<Vec<Ranked<String>>, MemoryError> {
        Ok(self
            .recall
            .iter()
            .take(top_k)
            .map(|text| Ranked {
                item: text.clone(),
                score: 1.0,
            })
            .collect())
    }
}

/// Backend whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingBackend;

#[async_trait]
impl MemoryBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn dimension(&self) -> usize {
        0
    }

    async fn add(&self, _text: &str, _tags: Vec<String>) -> Result<String, MemoryError> {
        Err(MemoryError::Backend("add unavailable".to_string()))
    }

    async fn retrieve_scored(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<Ranked<String>>, MemoryError> {
        Err(MemoryError::Backend("retrieve unavailable".to_string()))
    }
}
