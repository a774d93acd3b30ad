// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Themis Core - Compliance Check Service
//!
//! The server is responsible for:
//! - Accepting check-run triggers and executing analysis in the background
//! - Serving status polls, the completed feed and dashboard aggregates
//! - Bulk deletion with response-cache invalidation

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use themis_core::config::Config;
use themis_core::handlers::AppState;
use themis_core::server;
use themis_core::store::{CheckStore, PostgresStore, SqliteStore};
use themis_core::tags::TagCache;
use themis_core::worker::{AnalysisError, AnalysisTarget, Analyzer, CheckWorker};

/// Placeholder analyzer until the LLM-backed analysis crate is wired in.
///
/// Reports a clean run for every target so the full trigger/poll/feed path
/// can be exercised end to end.
struct NoopAnalyzer;

#[async_trait]
impl Analyzer for NoopAnalyzer {
    async fn analyze(
        &self,
        _target: &AnalysisTarget,
    ) -> Result<Vec<themis_core::model::Issue>, AnalysisError> {
        Ok(Vec::new())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("themis_core=info".parse().unwrap()),
        )
        .init();

    info!("Starting Themis Core");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_addr = %config.http_addr,
        api_keys = config.api_keys.len(),
        "Configuration loaded"
    );

    // Connect to database and run migrations; backend follows the URL scheme
    info!("Connecting to database...");
    let store: Arc<dyn CheckStore> = if config.database_url.starts_with("sqlite") {
        Arc::new(SqliteStore::connect(&config.database_url).await?)
    } else {
        Arc::new(PostgresStore::connect(&config.database_url).await?)
    };

    if !store.health_check_db().await? {
        anyhow::bail!("Database health check failed");
    }
    info!("Database connection established");

    let tags = Arc::new(TagCache::new());
    let worker = Arc::new(CheckWorker::new(
        store.clone(),
        Arc::new(NoopAnalyzer),
        tags.clone(),
    ));
    let state = Arc::new(AppState::new(store, worker, tags));

    info!("Themis Core initialized successfully");

    server::run(&config, state).await?;

    info!("Shutdown complete");
    Ok(())
}
