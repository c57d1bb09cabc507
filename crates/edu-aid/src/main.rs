//! Score-sheet analysis service.
//!
//! A teacher uploads a spreadsheet of student scores; the service
//! normalizes and aggregates the rows, computes class statistics and
//! performance clusters, asks a hosted generative model for narrative
//! analysis, and falls back to a deterministic rule engine whenever the
//! remote call fails. Results are cached per session for the dashboard
//! and report layer.

mod analysis;
mod config;
mod ingest;
mod insight;
mod server;
mod store;
mod types;

use crate::analysis::Analyzer;
use crate::config::{AppConfig, CourseCatalog};
use crate::insight::InsightClient;
use crate::store::MemorySessionStore;
use crate::types::AppState;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(Path::new(&path))
            .map_err(|e| anyhow::anyhow!("failed to load config from {path}: {e}"))?,
        None => AppConfig::from_env(),
    };

    let catalog = match &config.catalog_dir {
        Some(dir) => match CourseCatalog::load_from_directory(dir) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "Failed to load course catalog, using built-in table");
                CourseCatalog::built_in()
            }
        },
        None => CourseCatalog::built_in(),
    };

    if config.insight.enabled && config.insight.api_key.trim().is_empty() {
        warn!("Remote insight enabled but no API key configured; all requests will use the rule-based fallback");
    }

    let insight = InsightClient::new(config.insight.clone())
        .map_err(|e| anyhow::anyhow!("failed to build insight client: {e}"))?;

    let addr = format!("{}:{}", config.address, config.port);
    let state = Arc::new(AppState {
        config,
        analyzer: Analyzer::new(insight, catalog),
        store: Arc::new(MemorySessionStore::new()),
    });

    let router = server::create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Score analysis service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install shutdown handler");
        return;
    }
    info!("Shutdown signal received");
}
