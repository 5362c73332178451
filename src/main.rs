mod auth;
mod config;
mod dto;
mod guard;
mod handlers;
mod models;
mod repository;
mod service;
mod slug;

use std::sync::Arc;

use handlers::AppState;
use repository::{MemoryRepository, PgRepository, Repository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().inspect_err(|e| {
        tracing::error!("Failed to load config: {e}");
    })?;

    // Repository creation and migration
    let repo: Arc<dyn Repository> = match &cfg.database_dsn {
        Some(dsn) => Arc::new(PgRepository::new(dsn).await.inspect_err(|e| {
            tracing::error!("Failed to establish database connection: {e}");
        })?),
        None => {
            tracing::warn!("No database configured, notes are kept in memory only");
            Arc::new(MemoryRepository::new())
        }
    };

    repo.migrate().await.inspect_err(|e| {
        tracing::error!("Failed to migrate database: {e}");
    })?;
    tracing::info!("Storage ready, {} notes stored", repo.count_notes().await?);

    // Router config
    let state = Arc::new(AppState::new(repo));
    let router = handlers::router(state, cfg.secure_cookies);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.port)).await?;

    // Starting router
    tracing::info!("Notes server listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;

    Ok(())
}
