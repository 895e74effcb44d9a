//! # av-api — Binary Entry Point
//!
//! Starts the Axum HTTP server and the export worker pool. Binds to a
//! configurable port (default 8080).

use std::sync::Arc;
use std::time::Duration;

use av_api::state::{AppConfig, AppState};
use av_export::{CanonicalJsonRenderer, ExportWorkerPool};
use av_store::{ComplianceService, MemoryBlobStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let defaults = AppConfig::default();
    let config = AppConfig {
        port: env_parsed("PORT").unwrap_or(defaults.port),
        auth_token: std::env::var("AUTH_TOKEN").ok(),
        lookahead_days: env_parsed("ALERT_LOOKAHEAD_DAYS").unwrap_or(defaults.lookahead_days),
        export_workers: env_parsed("EXPORT_WORKERS").unwrap_or(defaults.export_workers),
    };

    // Initialize database pool (optional — absent means in-memory only).
    let db_pool = av_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let service = ComplianceService::new(Arc::new(MemoryBlobStore::new()))
        .with_lookahead_days(config.lookahead_days);

    let port = config.port;
    let export_workers = config.export_workers;
    let state = AppState::new(service.clone(), config, db_pool);

    // Background export workers drain the job queue; terminal transitions
    // are written through to the optional Postgres mirror.
    let workers = ExportWorkerPool::spawn_with_mirror(
        service,
        Arc::new(CanonicalJsonRenderer),
        export_workers,
        Duration::from_secs(1),
        state.export_mirror(),
    );

    let app = av_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("AccrediVault API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    workers.shutdown().await;
    Ok(())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
