//! Sentio application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the document store (SQLite or in-memory)
//! 3. Build the Gemini client from the configured API key variable
//! 4. Start the axum REST API server

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use sentio_api::routes;
use sentio_api::state::AppState;
use sentio_chat::GeminiClient;
use sentio_core::config::SentioConfig;
use sentio_core::error::SentioError;
use sentio_storage::{Database, DocumentStore, MemoryDocumentStore, SqliteDocumentStore};

use cli::CliArgs;

/// Expand ~ to the home directory in a configured path string.
fn expand_home(data_dir: &str) -> PathBuf {
    match data_dir.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(rest)
        }
        None => PathBuf::from(data_dir),
    }
}

/// Open the configured document store backend.
fn open_store(
    config: &SentioConfig,
    data_dir: &Path,
) -> Result<Arc<dyn DocumentStore>, Box<dyn std::error::Error>> {
    match config.storage.backend.as_str() {
        "sqlite" => {
            let db_path = data_dir.join(&config.storage.db_file);
            let db = Database::new(&db_path)?;
            tracing::info!(path = %db_path.display(), "SQLite document store opened");
            Ok(Arc::new(SqliteDocumentStore::new(Arc::new(db))))
        }
        "memory" => {
            tracing::warn!("Using in-memory document store; data is lost on exit");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        other => Err(SentioError::Config(format!("unknown storage backend '{}'", other)).into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = SentioConfig::load_or_default(&config_file);
    let data_dir = args
        .resolve_data_dir()
        .unwrap_or_else(|| expand_home(&config.general.data_dir));
    if let Some(level) = args.log_level.clone() {
        config.general.log_level = level;
    }

    // Tracing: RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Sentio v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let store = open_store(&config, &data_dir)?;

    let api_key = std::env::var(&config.llm.api_key_env).map_err(|_| {
        SentioError::Config(format!(
            "environment variable {} must hold the Gemini API key",
            config.llm.api_key_env
        ))
    })?;
    let generator = Arc::new(GeminiClient::new(api_key, &config.llm)?);
    tracing::info!(model = %config.llm.model, "Gemini client ready");

    let port = args.resolve_port(config.general.port);
    let state = AppState::new(&config, generator, store)?;
    let router = routes::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind");
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "API server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
