// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipe_social::api::{self, rate_limit::RateLimit, AppState};
use recipe_social::auth::SessionKeys;
use recipe_social::config::{Config, StorageBackend};
use recipe_social::db::init_database;
use recipe_social::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,recipe_social=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::init()?;
    info!("Initialized configuration");

    let store: Arc<dyn Store> = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = Arc::new(init_database().await?);
            info!("Connected to database");
            Arc::new(PgStore::new(db))
        }
        StorageBackend::Memory => {
            info!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    let mut state = AppState::new(store, SessionKeys::from_config(&config.auth));
    if config.rate_limit.enabled {
        state = state.with_rate_limit(RateLimit::from_config(&config.rate_limit)?);
        info!(
            "Rate limiting /api to {} requests per {}s per client",
            config.rate_limit.requests, config.rate_limit.window_secs
        );
    }

    // Prepare termination signal
    let (term_sender, term_receiver) = oneshot::channel::<()>();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, initiating graceful shutdown");
                let _ = term_sender.send(());
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    // A dropped sender means no signal handler, so keep serving
    let shutdown = async move {
        if term_receiver.await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    if let Err(e) = api::start_api_server(state, shutdown).await {
        error!("API server error: {}", e);
        return Err(e);
    }

    info!("Recipe social API shutdown complete");
    Ok(())
}
