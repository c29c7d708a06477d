//! Tests for layered configuration loading.

use super::*;
use crate::{EmbedderName, MemoryBackendKind, TranscriptionMode};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options that only look at the provided directory.
fn isolated_options(cwd: &Path) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.system_config_path = None;
    options.user_config_path = None;
    options
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = HelloexConfig::load_from_str("{}").expect("config");
    assert_eq!(config, HelloexConfig::default());
    assert_eq!(config.memory.backend, MemoryBackendKind::File);
    assert_eq!(config.memory.embedder, EmbedderName::Toy);
    assert_eq!(config.memory.top_k, 5);
    assert_eq!(config.ingest.max_chunk_chars, 800);
    assert_eq!(config.ingest.min_break_offset, 200);
    assert_eq!(config.transcription.mode, TranscriptionMode::Mock);
    assert_eq!(config.transcription.timeout_ms, 60_000);
    assert_eq!(config.memory.qdrant.timeout_ms, 5_000);
    assert_eq!(
        config.memory_path(),
        Path::new("data/storage").join("memory.jsonl")
    );
    assert_eq!(
        config.history_path(),
        Path::new("data/storage").join("messages.jsonl")
    );
}

/// JSON5 syntax (comments, unquoted keys, trailing commas) is accepted.
#[test]
fn parse_json5_features() {
    let json5 = r#"{
        // local qdrant
        memory: {
            backend: "qdrant",
            qdrant: { url: "http://localhost:6333", collection: "mem", },
            top_k: 3,
        },
        storage: { data_dir: "/var/lib/helloex" },
    }"#;
    let config = HelloexConfig::load_from_str(json5).expect("config");
    assert_eq!(config.memory.backend, MemoryBackendKind::Qdrant);
    assert_eq!(config.memory.qdrant.url.as_deref(), Some("http://localhost:6333"));
    assert_eq!(config.memory.qdrant.collection, "mem");
    assert_eq!(config.memory.top_k, 3);
    assert_eq!(
        config.memory_path(),
        Path::new("/var/lib/helloex").join("memory.jsonl")
    );
}

/// The model embedder defaults to MiniLM and accepts another model name.
#[test]
fn parse_model_embedder() {
    let config = HelloexConfig::load_from_str(r#"{ memory: { embedder: "model" } }"#)
        .expect("config");
    assert_eq!(config.memory.embedder, EmbedderName::Model);
    assert_eq!(config.memory.model, "all-MiniLM-L6-v2");

    let config = HelloexConfig::load_from_str(
        r#"{ memory: { embedder: "model", model: "bge-base-en-v1.5" } }"#,
    )
    .expect("config");
    assert_eq!(config.memory.model, "bge-base-en-v1.5");

    let err = HelloexConfig::load_from_str(r#"{ memory: { model: 7 } }"#).unwrap_err();
    assert!(format!("{err}").contains("memory.model"));
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = HelloexConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("unknown key"));
    assert!(msg.contains("config:unexpected"));
}

/// Reject unknown nested keys with the dotted path.
#[test]
fn rejects_unknown_nested_key() {
    let err = HelloexConfig::load_from_str(r#"{ memory: { qdrant: { port: 1 } } }"#).unwrap_err();
    assert!(format!("{err}").contains("memory.qdrant.port"));
}

/// Reject invalid enum values.
#[test]
fn rejects_invalid_backend() {
    let err = HelloexConfig::load_from_str(r#"{ memory: { backend: "redis" } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("memory.backend"));
    assert!(msg.contains("invalid memory backend"));
}

/// Reject wrong value types.
#[test]
fn rejects_wrong_types() {
    let err = HelloexConfig::load_from_str(r#"{ ingest: { max_chunk_chars: "big" } }"#).unwrap_err();
    assert!(format!("{err}").contains("ingest.max_chunk_chars"));

    let err =
        HelloexConfig::load_from_str(r#"{ server: { cors_allow_origins: ["a", 1] } }"#).unwrap_err();
    assert!(format!("{err}").contains("server.cors_allow_origins[1]"));
}

/// Cross-field invariants are enforced after decoding.
#[test]
fn validate_rejects_bad_values() {
    for json5 in [
        r#"{ ingest: { max_chunk_chars: 0 } }"#,
        r#"{ memory: { top_k: 0 } }"#,
        r#"{ memory: { embedder: "hashing", dimension: 0 } }"#,
        r#"{ memory: { embedder: "model", model: " " } }"#,
        r#"{ memory: { backend: "qdrant" } }"#,
        r#"{ memory: { backend: "chroma", chroma: { url: "  " } } }"#,
        r#"{ transcription: { mode: "http" } }"#,
        r#"{ server: { bind: "not an address" } }"#,
    ] {
        let err = HelloexConfig::load_from_str(json5).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid(_)),
            "expected invalid config for {json5}, got {err}"
        );
    }
}

/// Ensure later layers override earlier ones while untouched keys survive.
#[test]
fn layered_config_precedence() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");

    let system_config = root.join("system.json5");
    write_json5(
        &system_config,
        r#"{ memory: { top_k: 1, embedder: "hashing" }, server: { bind: "0.0.0.0:9000" } }"#,
    );
    let user_config = root.join("user.json5");
    write_json5(&user_config, r#"{ memory: { top_k: 2 } }"#);
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ memory: { top_k: 3 }, storage: { data_dir: "cwd-data" } }"#,
    );

    let mut options = LayeredConfigOptions::new(&cwd);
    options.system_config_path = Some(system_config.clone());
    options.user_config_path = Some(user_config.clone());

    let layered = HelloexConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.memory.top_k, 3);
    assert_eq!(layered.config.memory.embedder, EmbedderName::Hashing);
    assert_eq!(layered.config.server.bind, "0.0.0.0:9000");
    assert_eq!(layered.config.storage.data_dir, "cwd-data");
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::System,
            ConfigLayerSource::User,
            ConfigLayerSource::Cwd
        ]
    );
}

/// Runtime layers are applied last.
#[test]
fn runtime_override_wins() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(&root.join(DEFAULT_CONFIG_FILE), r#"{ memory: { top_k: 3 } }"#);
    let runtime_config = root.join("runtime.json5");
    write_json5(&runtime_config, r#"{ memory: { top_k: 9 } }"#);

    let options = isolated_options(root).with_runtime_path(&runtime_config);
    let layered = HelloexConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.memory.top_k, 9);
    assert_eq!(
        layered.layers.last().map(|layer| layer.source),
        Some(ConfigLayerSource::Runtime)
    );
}

/// A missing runtime layer is an error, missing optional layers are not.
#[test]
fn missing_runtime_layer_fails() {
    let temp = TempDir::new().expect("tmp");
    let layered = HelloexConfig::load_layered_with_options(isolated_options(temp.path()))
        .expect("layered");
    assert!(layered.layers.is_empty());

    let options = isolated_options(temp.path()).with_runtime_path(temp.path().join("nope.json5"));
    let err = HelloexConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

/// A schema error in any layer names that layer.
#[test]
fn layer_schema_errors_name_the_layer() {
    let temp = TempDir::new().expect("tmp");
    write_json5(
        &temp.path().join(DEFAULT_CONFIG_FILE),
        r#"{ history: { recent_limit: -1 } }"#,
    );
    let err = HelloexConfig::load_layered_with_options(isolated_options(temp.path())).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("history.recent_limit"));
}

/// The same file configured twice is only applied once.
#[test]
fn duplicate_layer_paths_load_once() {
    let temp = TempDir::new().expect("tmp");
    let cwd_config = temp.path().join(DEFAULT_CONFIG_FILE);
    write_json5(&cwd_config, r#"{ memory: { top_k: 4 } }"#);
    let mut options = isolated_options(temp.path());
    options.user_config_path = Some(cwd_config);
    let layered = HelloexConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::User);
}

/// The builder starts from defaults.
#[test]
fn builder_overrides_sections() {
    let config = HelloexConfig::builder()
        .data_dir("/tmp/helloex")
        .ingest(crate::IngestConfig {
            max_chunk_chars: 100,
            min_break_offset: 10,
        })
        .build();
    assert_eq!(config.ingest.max_chunk_chars, 100);
    assert_eq!(config.memory_path(), Path::new("/tmp/helloex/memory.jsonl"));
    assert!(config.validate().is_ok());
}
