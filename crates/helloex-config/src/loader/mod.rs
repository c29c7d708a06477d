//! JSON5 config discovery and layering.
//!
//! Layers are read lowest precedence first: system, user, cwd, then any
//! runtime paths. Each one is schema-checked on its own so errors name the
//! offending file; the merged result is decoded and validated once.

mod discover;
mod merge;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, EmbedderName, HelloexConfig, MemoryBackendKind, TranscriptionMode};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "helloex.json5";
/// Directory under `$HOME` holding the user layer.
const DEFAULT_CONFIG_DIR: &str = ".helloex";
/// System-wide config location; only consulted on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/helloex/helloex.json5";

/// Result of a layered load.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: HelloexConfig,
    /// Contributing layers in the order they were applied.
    pub layers: Vec<ConfigLayer>,
}

/// Where a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    System,
    User,
    Cwd,
    /// `--config` and other explicit paths; must exist.
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Layer locations. `None` disables the system or user layer.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    pub cwd: PathBuf,
    pub system_config_path: Option<PathBuf>,
    pub user_config_path: Option<PathBuf>,
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Standard locations, with the cwd layer read from `cwd`.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: cfg!(unix).then(|| PathBuf::from(SYSTEM_CONFIG_PATH)),
            user_config_path: discover::user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl HelloexConfig {
    /// Read exactly one file, with no layering.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading config (path={})", path.display());
        Self::load_from_str(&std::fs::read_to_string(path)?)
    }

    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Layered load from the standard locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        debug!("layered config load (cwd={})", cwd.as_ref().display());
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Layered load from explicit locations.
    ///
    /// Missing system, user or cwd files are skipped. A missing runtime path
    /// is an error.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = discover::canonical(&options.cwd)?;
        let cwd_path = cwd.join(DEFAULT_CONFIG_FILE);
        let optional = [
            (ConfigLayerSource::System, options.system_config_path.as_deref()),
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
            (ConfigLayerSource::Cwd, Some(cwd_path.as_path())),
        ];

        let mut loaded = Vec::new();
        let mut seen = HashSet::new();
        for (source, path) in optional {
            let Some(path) = path else { continue };
            // The same file reached twice (e.g. cwd == home) counts once.
            let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            if !seen.insert(key) {
                continue;
            }
            loaded.extend(discover::read_layer_if_present(source, path)?);
        }
        for path in &options.runtime_paths {
            loaded.push(discover::read_layer(ConfigLayerSource::Runtime, path)?);
        }

        let mut merged = Value::Object(Default::default());
        for layer in &loaded {
            merge::merge_json_values(&mut merged, &layer.value);
        }
        let config = config_from_value(merged, "effective")?;
        let layers: Vec<ConfigLayer> = loaded.into_iter().map(|layer| layer.meta).collect();
        info!("config ready (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Cross-field checks run after decoding.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server.bind must be a socket address, got {:?}",
                self.server.bind
            )));
        }
        if self.ingest.max_chunk_chars == 0 {
            return Err(ConfigError::Invalid(
                "ingest.max_chunk_chars must be greater than zero".to_string(),
            ));
        }
        if self.memory.top_k == 0 {
            return Err(ConfigError::Invalid(
                "memory.top_k must be greater than zero".to_string(),
            ));
        }
        if self.memory.embedder == EmbedderName::Hashing && self.memory.dimension == 0 {
            return Err(ConfigError::Invalid(
                "memory.dimension must be greater than zero for the hashing embedder".to_string(),
            ));
        }
        if self.memory.embedder == EmbedderName::Model && self.memory.model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "memory.model must name a model for the model embedder".to_string(),
            ));
        }
        let remote_url = match self.memory.backend {
            MemoryBackendKind::File => None,
            MemoryBackendKind::Qdrant => Some(("memory.qdrant.url", &self.memory.qdrant.url)),
            MemoryBackendKind::Chroma => Some(("memory.chroma.url", &self.memory.chroma.url)),
        };
        if let Some((path, url)) = remote_url {
            require_url(path, url.as_deref())?;
        }
        if self.transcription.mode == TranscriptionMode::Http {
            require_url("transcription.url", self.transcription.url.as_deref())?;
        }
        Ok(())
    }
}

fn require_url(path: &str, url: Option<&str>) -> Result<(), ConfigError> {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => Ok(()),
        _ => Err(ConfigError::Invalid(format!(
            "{path} is required for the selected mode"
        ))),
    }
}

#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<HelloexConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: HelloexConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
