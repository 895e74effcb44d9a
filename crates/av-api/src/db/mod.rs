//! # Database Persistence Layer
//!
//! Optional Postgres write-through mirror via SQLx.
//!
//! ## Architecture
//!
//! The in-memory registry is authoritative. When `DATABASE_URL` is set,
//! the API mirrors audit events and export job records to PostgreSQL so
//! the compliance trail survives restarts. When absent, the API runs
//! in-memory only (development and testing).
//!
//! Mirror failures are surfaced to the client — a record that exists only
//! in memory would be lost on restart, and that loss must not be silent.

pub mod audit;
pub mod exports;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 The audit trail will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
