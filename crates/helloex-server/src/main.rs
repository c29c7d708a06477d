//! `helloex` command line: run the HTTP server or drive ingestion and recall locally.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use helloex_config::{HelloexConfig, LayeredConfigOptions};
use helloex_ingest::parse_tag_list;
use helloex_server::{AppState, serve};
use log::{debug, info};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line options.
#[derive(Parser)]
#[command(name = "helloex", version)]
struct Cli {
    /// Extra JSON5 config layer applied on top of the discovered ones.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address, overriding `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Ingest files into the memory store.
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Source label appended to every chunk's tags.
        #[arg(long)]
        source: Option<String>,
        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,
    },
    /// Print the memories closest to a query.
    Recall {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address {bind:?}"))?;
            let state = Arc::new(AppState::from_config(&config).await?);
            serve(state, addr, &config.server.cors_allow_origins).await
        }
        Command::Ingest {
            files,
            source,
            tags,
        } => {
            let state = AppState::from_config(&config).await?;
            let tags = tags.as_deref().map(parse_tag_list).unwrap_or_default();
            let mut total = 0usize;
            for path in &files {
                let data = std::fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let outcome = state
                    .ingestor
                    .ingest_file(&data, &filename, source.as_deref(), &tags)
                    .await
                    .with_context(|| format!("failed to ingest {}", path.display()))?;
                println!("{}\t{}\t{}", outcome.filename, outcome.kind, outcome.ids.len());
                total += outcome.ids.len();
            }
            info!("ingest finished (files={}, embeddings={})", files.len(), total);
            Ok(())
        }
        Command::Recall { query, top_k } => {
            if query.trim().is_empty() {
                bail!("query must not be empty");
            }
            let state = AppState::from_config(&config).await?;
            let results = state
                .store
                .retrieve_scored(&query, top_k)
                .await
                .context("recall failed")?;
            for ranked in results {
                println!("{:.4}\t{}", ranked.score, ranked.item);
            }
            Ok(())
        }
    }
}

fn load_config(runtime_path: Option<&Path>) -> anyhow::Result<HelloexConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = runtime_path {
        options = options.with_runtime_path(path);
    }
    let layered =
        HelloexConfig::load_layered_with_options(options).context("failed to load config")?;
    debug!("config loaded (layers={})", layered.layers.len());
    Ok(layered.config)
}
