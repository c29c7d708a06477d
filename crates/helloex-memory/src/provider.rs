//! Memory backend abstraction and the flat-file implementation.

use crate::embedding::Embedder;
use crate::error::MemoryError;
use crate::model::MemoryRecord;
use crate::rank::{Ranked, rank_top_k};
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[async_trait]
/// Storage and similarity search over memory records.
pub trait MemoryBackend: Send + Sync {
    /// Short backend identifier ("file", "qdrant", ...).
    fn name(&self) -> &'static str;

    /// Dimension of the vectors this backend stores.
    fn dimension(&self) -> usize;

    /// Embed and durably store `text`, returning the new record id.
    async fn add(&self, text: &str, tags: Vec<String>) -> Result<String, MemoryError>;

    /// Return up to `top_k` stored texts with their similarity scores, best first.
    async fn retrieve_scored(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Ranked<String>>, MemoryError>;

    /// Return up to `top_k` stored texts, best first.
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, MemoryError> {
        let ranked = self.retrieve_scored(query, top_k).await?;
        Ok(ranked.into_iter().map(|ranked| ranked.item).collect())
    }
}

/// Result of reading a JSONL memory log.
#[derive(Debug, Default)]
pub struct LoadedLog {
    /// Records that parsed and matched the expected dimension.
    pub records: Vec<MemoryRecord>,
    /// Number of non-blank lines that were rejected.
    pub skipped: usize,
    /// The file ends without a newline (a torn final write).
    pub torn_tail: bool,
}

/// Read every valid record from a JSONL log.
///
/// Blank lines are ignored. Lines that fail to decode, or whose vector length
/// differs from `dimension`, are skipped and counted. A missing file is empty.
pub fn load_log(path: &Path, dimension: usize) -> Result<LoadedLog, MemoryError> {
    let mut loaded = LoadedLog::default();
    if !path.exists() {
        return Ok(loaded);
    }
    let file = OpenOptions::new().read(true).open(path)?;
    let reader = BufReader::new(file);
    for line in reader.split(b'\n') {
        let line = line?;
        loaded.torn_tail = false;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<MemoryRecord>(&line) {
            Ok(record) if record.vector.len() == dimension => loaded.records.push(record),
            Ok(record) => {
                debug!(
                    "skipping memory record with wrong dimension (id={}, len={})",
                    record.id,
                    record.vector.len()
                );
                loaded.skipped += 1;
            }
            Err(err) => {
                debug!("skipping malformed memory line: {err}");
                loaded.skipped += 1;
            }
        }
        loaded.torn_tail = true;
    }
    if loaded.torn_tail {
        loaded.torn_tail = !ends_with_newline(path)?;
    }
    Ok(loaded)
}

fn ends_with_newline(path: &Path) -> Result<bool, MemoryError> {
    let bytes = std::fs::read(path)?;
    Ok(bytes.last().is_none_or(|byte| *byte == b'\n'))
}

/// File-backed backend: an append-only JSONL log plus an in-memory cache.
///
/// The cache is loaded lazily on first use. `add` serializes writers through a
/// single append lock and pushes to the cache only after the line is written,
/// so readers never see a record that is not durable.
pub struct FileMemoryBackend {
    /// Location of the JSONL log.
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    cache: RwLock<Option<Vec<MemoryRecord>>>,
    append_lock: Mutex<()>,
    skipped: AtomicUsize,
    torn_tail: AtomicBool,
}

impl FileMemoryBackend {
    /// Create a backend for the log at `path`. The file itself is created on first add.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!(
            "initialized file memory backend (path={}, embedder={}, dimension={})",
            path.display(),
            embedder.name(),
            embedder.dimension()
        );
        Ok(Self {
            path,
            embedder,
            cache: RwLock::new(None),
            append_lock: Mutex::new(()),
            skipped: AtomicUsize::new(0),
            torn_tail: AtomicBool::new(false),
        })
    }

    /// Path of the backing log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines rejected by the most recent load.
    pub fn skipped_lines(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Number of records visible to retrieval.
    pub fn len(&self) -> Result<usize, MemoryError> {
        self.ensure_loaded()?;
        Ok(self.cache.read().as_ref().map_or(0, Vec::len))
    }

    /// True when no records are stored.
    pub fn is_empty(&self) -> Result<bool, MemoryError> {
        Ok(self.len()? == 0)
    }

    /// Load the log into the cache once.
    fn ensure_loaded(&self) -> Result<(), MemoryError> {
        if self.cache.read().is_some() {
            return Ok(());
        }
        let mut cache = self.cache.write();
        if cache.is_some() {
            return Ok(());
        }
        let loaded = load_log(&self.path, self.embedder.dimension())?;
        if loaded.skipped > 0 {
            warn!(
                "skipped malformed memory lines (path={}, skipped={})",
                self.path.display(),
                loaded.skipped
            );
        }
        info!(
            "loaded memory log (path={}, records={})",
            self.path.display(),
            loaded.records.len()
        );
        self.skipped.store(loaded.skipped, Ordering::Relaxed);
        self.torn_tail.store(loaded.torn_tail, Ordering::Relaxed);
        *cache = Some(loaded.records);
        Ok(())
    }

    fn append_line(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let mut line = String::new();
        if self.torn_tail.swap(false, Ordering::Relaxed) {
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(record)?);
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for FileMemoryBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Append a record to the log, then make it visible in the cache.
    async fn add(&self, text: &str, tags: Vec<String>) -> Result<String, MemoryError> {
        let _append = self.append_lock.lock();
        self.ensure_loaded()?;
        let record = MemoryRecord::new(text, self.embedder.embed(text), tags);
        self.append_line(&record)?;
        let id = record.id.clone();
        debug!(
            "stored memory record (id={}, text_len={}, tags={})",
            id,
            record.text.len(),
            record.tags.len()
        );
        self.cache.write().get_or_insert_with(Vec::new).push(record);
        Ok(id)
    }

    /// Rank every cached record against the query.
    async fn retrieve_scored(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Ranked<String>>, MemoryError> {
        self.ensure_loaded()?;
        let query_vector = self.embedder.embed(query);
        let cache = self.cache.read();
        let records = cache.as_deref().unwrap_or_default();
        let ranked = rank_top_k(
            &query_vector,
            records
                .iter()
                .map(|record| (record, record.vector.as_slice())),
            top_k,
        );
        debug!(
            "recall memory (candidates={}, returned={})",
            records.len(),
            ranked.len()
        );
        Ok(ranked
            .into_iter()
            .map(|ranked| Ranked {
                item: ranked.item.text.clone(),
                score: ranked.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileMemoryBackend, MemoryBackend, load_log};
    use crate::embedding::{Embedder, TOY_DIMENSION, ToyEmbedder};
    use crate::model::MemoryRecord;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn toy_backend(path: &std::path::Path) -> FileMemoryBackend {
        FileMemoryBackend::open(path, Arc::new(ToyEmbedder)).expect("backend")
    }

    fn record_line(text: &str) -> String {
        let record = MemoryRecord::new(text, ToyEmbedder.embed(text), vec!["t".to_string()]);
        serde_json::to_string(&record).expect("json")
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let temp = tempdir().expect("tempdir");
        let backend = toy_backend(&temp.path().join("memory.jsonl"));
        let results = backend.retrieve("anything", 5).await.expect("retrieve");
        assert!(results.is_empty());
        assert!(!temp.path().join("memory.jsonl").exists());
    }

    #[tokio::test]
    async fn add_creates_log_lazily_and_round_trips() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("memory.jsonl");
        let backend = toy_backend(&path);
        let id = backend
            .add("Hello there, old friend.", vec!["x".to_string()])
            .await
            .expect("add");
        assert!(id.starts_with("mem_"));
        let results = backend
            .retrieve("Hello there, old friend.", 1)
            .await
            .expect("retrieve");
        assert_eq!(results, vec!["Hello there, old friend.".to_string()]);

        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents.lines().count(), 1);
        let stored: MemoryRecord =
            serde_json::from_str(contents.lines().next().expect("line")).expect("record");
        assert_eq!(stored.id, id);
        assert_eq!(stored.tags, vec!["x".to_string()]);
        assert_eq!(stored.vector.len(), TOY_DIMENSION);
    }

    #[tokio::test]
    async fn top_k_larger_than_store_returns_all() {
        let temp = tempdir().expect("tempdir");
        let backend = toy_backend(&temp.path().join("memory.jsonl"));
        for text in ["alpha", "beta", "gamma"] {
            backend.add(text, Vec::new()).await.expect("add");
        }
        let results = backend.retrieve("alpha", 10).await.expect("retrieve");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], "alpha");
        assert!(backend.retrieve("alpha", 0).await.expect("retrieve").is_empty());
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped_and_counted() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        let contents = format!(
            "{}\n{{not json\n\n{}\n{{\"id\":\"mem_x\",\"text\":\"short\",\"vector\":[1.0]}}\n{}\n",
            record_line("one"),
            record_line("two"),
            record_line("three")
        );
        fs::write(&path, contents).expect("write");

        let backend = toy_backend(&path);
        assert_eq!(backend.len().expect("len"), 3);
        assert_eq!(backend.skipped_lines(), 2);
    }

    #[test]
    fn load_log_reports_torn_tail() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        fs::write(&path, format!("{}\n{{\"id\":\"mem_", record_line("kept"))).expect("write");
        let loaded = load_log(&path, TOY_DIMENSION).expect("load");
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.skipped, 1);
        assert!(loaded.torn_tail);
    }

    #[tokio::test]
    async fn append_after_torn_tail_starts_a_fresh_line() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        fs::write(&path, format!("{}\n{{\"id\":\"mem_", record_line("kept"))).expect("write");

        let backend = toy_backend(&path);
        backend.add("after crash", Vec::new()).await.expect("add");

        let reloaded = toy_backend(&path);
        assert_eq!(reloaded.len().expect("len"), 2);
        assert_eq!(reloaded.skipped_lines(), 1);
    }

    #[tokio::test]
    async fn reopened_backend_sees_previous_records() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        {
            let backend = toy_backend(&path);
            backend.add("persisted", Vec::new()).await.expect("add");
        }
        let backend = toy_backend(&path);
        let results = backend.retrieve("persisted", 1).await.expect("retrieve");
        assert_eq!(results, vec!["persisted".to_string()]);
    }

    #[tokio::test]
    async fn scored_results_are_non_increasing() {
        let temp = tempdir().expect("tempdir");
        let backend = toy_backend(&temp.path().join("memory.jsonl"));
        for text in [
            "late night calls",
            "zzz",
            "coffee in the morning",
            "we used to walk the dog",
            "aaaa",
        ] {
            backend.add(text, Vec::new()).await.expect("add");
        }
        for k in 1..=5 {
            let ranked = backend
                .retrieve_scored("calls at night", k)
                .await
                .expect("retrieve");
            assert_eq!(ranked.len(), k);
            for pair in ranked.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_lose_nothing() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        let backend = Arc::new(toy_backend(&path));
        let mut handles = Vec::new();
        for idx in 0..32 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend
                    .add(&format!("memory number {idx}"), Vec::new())
                    .await
                    .expect("add")
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }
        assert_eq!(backend.len().expect("len"), 32);
        let reloaded = toy_backend(&path);
        assert_eq!(reloaded.len().expect("len"), 32);
        assert_eq!(reloaded.skipped_lines(), 0);
    }
}
