//! End-to-end tests against a real listener on an ephemeral port.

use helloex_config::{HelloexConfig, MemoryBackendKind, MemoryConfig, VectorStoreConfig};
use helloex_ingest::{ChunkOptions, Ingestor, MockTranscriber};
use helloex_memory::{ConversationLog, MemoryStore};
use helloex_server::{AppState, EchoReplyGenerator, create_router};
use helloex_test_utils::{FailingBackend, RecordingBackend};
use pretty_assertions::assert_eq;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tempfile::TempDir;

async fn spawn(state: AppState) -> String {
    let router = create_router(Arc::new(state), &["*".to_string()]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

/// Server backed by the file store under a fresh data directory.
async fn file_server(dir: &TempDir) -> String {
    let config = HelloexConfig::builder().data_dir(dir.path()).build();
    let state = AppState::from_config(&config).await.expect("state");
    spawn(state).await
}

/// Server backed by a stub backend.
async fn stub_server(dir: &TempDir, backend: Arc<dyn helloex_memory::MemoryBackend>) -> String {
    let store = MemoryStore::from_backend(backend, 5);
    let ingestor = Ingestor::new(store, Arc::new(MockTranscriber), ChunkOptions::default());
    let history = ConversationLog::open(dir.path().join("messages.jsonl")).expect("history");
    spawn(AppState::new(ingestor, history).with_replies(Arc::new(EchoReplyGenerator))).await
}

async fn post_json(base: &str, path: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .expect("send");
    let status = response.status().as_u16();
    (status, response.json().await.expect("json body"))
}

async fn get_json(base: &str, path: &str) -> (u16, Value) {
    let response = reqwest::get(format!("{base}{path}")).await.expect("send");
    let status = response.status().as_u16();
    (status, response.json().await.expect("json body"))
}

#[tokio::test]
async fn health_reports_active_backend() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = file_server(&dir).await;
    let (status, body) = get_json(&base, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"status": "ok", "backend": "file", "fallback": null})
    );
}

#[tokio::test]
async fn unreachable_qdrant_falls_back_to_file_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = HelloexConfig::builder()
        .data_dir(dir.path())
        .memory(MemoryConfig {
            backend: MemoryBackendKind::Qdrant,
            qdrant: VectorStoreConfig {
                url: Some("http://127.0.0.1:1".to_string()),
                timeout_ms: 200,
                ..VectorStoreConfig::default()
            },
            ..MemoryConfig::default()
        })
        .build();
    let base = spawn(AppState::from_config(&config).await.expect("state")).await;
    let (_, body) = get_json(&base, "/health").await;
    assert_eq!(body["backend"], "file");
    assert!(
        body["fallback"]
            .as_str()
            .expect("fallback reason")
            .starts_with("qdrant backend unavailable")
    );
}

#[tokio::test]
async fn upload_rejects_blank_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = file_server(&dir).await;
    let (status, body) = post_json(&base, "/memory/upload", json!({"text": "   "})).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"detail": "text is required"}));

    let (status, _) = post_json(&base, "/memory/upload", json!({})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn uploaded_memories_are_retrievable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = file_server(&dir).await;
    for text in ["aaaa aaaa", "zzzz zzzz", "mixed az az"] {
        let (status, body) = post_json(&base, "/memory/upload", json!({"text": text})).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "stored");
        assert!(body["embedding_id"].as_str().expect("id").starts_with("mem_"));
    }

    let (status, body) = post_json(
        &base,
        "/memory/retrieve",
        json!({"query": "aaa", "top_k": 1}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"results": ["aaaa aaaa"]}));

    let (_, body) = post_json(&base, "/memory/retrieve", json!({"query": "aaa"})).await;
    assert_eq!(body["results"].as_array().expect("results").len(), 3);

    let (status, body) = post_json(&base, "/memory/retrieve", json!({"query": ""})).await;
    assert_eq!(status, 400);
    assert_eq!(body["detail"], "query is required");

    assert!(dir.path().join("memory.jsonl").exists());
}

#[tokio::test]
async fn multipart_ingest_reports_totals() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(RecordingBackend::new());
    let base = stub_server(&dir, backend.clone()).await;

    let form = Form::new()
        .part(
            "files",
            Part::bytes(b"We used to talk every night.".to_vec()).file_name("notes.txt"),
        )
        .part(
            "files",
            Part::bytes(br#"{"messages": [{"text": "one"}, {"content": "two"}]}"#.to_vec())
                .file_name("chat.json"),
        )
        .part(
            "files",
            Part::bytes(vec![0u8, 1, 2, 3]).file_name("clip.wav"),
        )
        .part(
            "files",
            Part::bytes(vec![0x89, b'P', b'N', b'G']).file_name("photo.png"),
        )
        .text("source", "journal")
        .text("tags", "family, calls");
    let response = reqwest::Client::new()
        .post(format!("{base}/ingest/upload"))
        .multipart(form)
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("json");

    assert_eq!(body["total_files"], 4);
    assert_eq!(body["total_embeddings"], 4);
    let kinds: Vec<&str> = body["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["kind"].as_str().expect("kind"))
        .collect();
    assert_eq!(kinds, vec!["text", "json", "audio", "image"]);
    assert_eq!(body["items"][3]["embedding_ids"], json!([]));

    let added = backend.added();
    assert_eq!(added.len(), 4);
    assert_eq!(added[0].0, "We used to talk every night.");
    assert_eq!(added[1].0, "one");
    assert_eq!(added[3].0, MockTranscriber::TEXT);
    for (_, tags) in &added {
        assert_eq!(tags, &vec!["family", "calls", "journal"]);
    }
}

#[tokio::test]
async fn ingest_without_files_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = stub_server(&dir, Arc::new(RecordingBackend::new())).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/ingest/upload"))
        .multipart(Form::new().text("source", "journal"))
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn chat_uses_memories_and_records_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(RecordingBackend::with_recall(vec![
        "I still miss our late-night calls.".to_string(),
    ]));
    let base = stub_server(&dir, backend).await;

    let (status, body) = post_json(&base, "/chat", json!({"message": "hello mom"})).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "reply_text": "I hear you. It\u{2019}s okay to feel this way. AI:",
            "sentiment": "calm",
            "memories_used": ["I still miss our late-night calls."],
        })
    );

    let (status, body) = get_json(&base, "/history").await;
    assert_eq!(status, 200);
    let messages = body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "hello mom");
    assert_eq!(messages[1]["role"], "assistant");
    assert!(messages[1]["created_at"].is_string());

    let (_, body) = get_json(&base, "/history?limit=1").await;
    let messages = body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "assistant");
}

#[tokio::test]
async fn chat_rejects_empty_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = stub_server(&dir, Arc::new(RecordingBackend::new())).await;
    let (status, body) = post_json(&base, "/chat", json!({"message": "  "})).await;
    assert_eq!(status, 400);
    assert_eq!(body["detail"], "message is required");
    let (_, body) = get_json(&base, "/history").await;
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn chat_survives_failing_backend_but_upload_does_not() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = stub_server(&dir, Arc::new(FailingBackend)).await;

    let (status, body) = post_json(&base, "/chat", json!({"message": "anyone there?"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["memories_used"], json!([]));

    let (status, body) = post_json(&base, "/memory/upload", json!({"text": "kept?"})).await;
    assert_eq!(status, 500);
    assert!(body["detail"].as_str().expect("detail").contains("add unavailable"));
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut text = String::new();
    archive
        .by_name(name)
        .expect("entry")
        .read_to_string(&mut text)
        .expect("utf-8 entry");
    text
}

#[tokio::test]
async fn export_bundles_both_logs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = file_server(&dir).await;
    let (status, _) = post_json(&base, "/memory/upload", json!({"text": "we met in Lisbon"})).await;
    assert_eq!(status, 200);
    let (status, _) = post_json(&base, "/chat", json!({"message": "remember Lisbon?"})).await;
    assert_eq!(status, 200);

    let response = reqwest::get(format!("{base}/export")).await.expect("send");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["content-type"], "application/zip");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=helloex_export.zip"
    );
    let bytes = response.bytes().await.expect("body").to_vec();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["memory.jsonl", "messages.jsonl", "report.txt"]);
    assert!(read_entry(&mut archive, "memory.jsonl").contains("we met in Lisbon"));
    assert!(read_entry(&mut archive, "messages.jsonl").contains("remember Lisbon?"));
    assert!(read_entry(&mut archive, "report.txt").starts_with("helloEx export generated at "));
}

#[tokio::test]
async fn export_without_logs_still_has_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let history = ConversationLog::open(dir.path().join("never-written.jsonl")).expect("history");
    let store = MemoryStore::from_backend(Arc::new(RecordingBackend::new()), 5);
    let ingestor = Ingestor::new(store, Arc::new(MockTranscriber), ChunkOptions::default());
    let state = AppState::new(ingestor, history).with_memory_path(dir.path().join("missing.jsonl"));
    let base = spawn(state).await;

    let bytes = reqwest::get(format!("{base}/export"))
        .await
        .expect("send")
        .bytes()
        .await
        .expect("body")
        .to_vec();
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
    let names: Vec<&str> = archive.file_names().collect();
    assert_eq!(names, vec!["report.txt"]);
}
