//! # Application State
//!
//! Shared state for all route handlers: the in-memory compliance service
//! (authoritative), the optional Postgres mirror, and runtime configuration.

use std::sync::Arc;

use sqlx::PgPool;

use av_core::Timestamp;
use av_export::ExportMirror;
use av_store::ComplianceService;

use crate::error::AppError;

/// Runtime configuration, built from environment variables in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port for the HTTP listener.
    pub port: u16,
    /// Shared bearer-token secret. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Near-due alert lookahead window in days.
    pub lookahead_days: u64,
    /// Number of export worker tasks.
    pub export_workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            lookahead_days: av_engine::DEFAULT_LOOKAHEAD_DAYS,
            export_workers: 2,
        }
    }
}

/// Shared application state. Cheaply cloneable; clones share the service.
#[derive(Clone)]
pub struct AppState {
    pub service: ComplianceService,
    pub config: AppConfig,
    /// Optional Postgres write-through mirror. The in-memory service is
    /// authoritative; the mirror exists for restart durability.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(service: ComplianceService, config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            service,
            config,
            db_pool,
        }
    }

    /// Mirror the audit events a mutating operation just recorded.
    ///
    /// Mutating handlers stamp the whole operation with one clock reading,
    /// so `recorded_at(now)` recovers exactly the events that operation
    /// appended. Mirror failure is surfaced to the client: the in-memory
    /// record exists, but it would be lost on restart.
    pub async fn mirror_audit(&self, now: Timestamp) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        for event in self.service.audit().recorded_at(now) {
            if let Err(e) = crate::db::audit::append(pool, &event).await {
                tracing::error!(error = %e, "failed to mirror audit event to database");
                return Err(AppError::Internal(
                    "operation recorded in-memory but audit mirror failed".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Mirror an export job record (insert or update by id).
    pub async fn mirror_export(&self, job: &av_model::ExportJob) -> Result<(), AppError> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };
        if let Err(e) = crate::db::exports::upsert(pool, job).await {
            tracing::error!(job_id = %job.id, error = %e, "failed to mirror export job to database");
            return Err(AppError::Internal(
                "export job recorded in-memory but database mirror failed".to_string(),
            ));
        }
        Ok(())
    }

    /// Mirror hook for the export worker pool: writes each job's terminal
    /// record and the audit events its transition stamped through to
    /// Postgres. Unlike handler mirroring there is no client to surface a
    /// failure to, so errors are logged and the queue keeps draining.
    pub fn export_mirror(&self) -> Option<ExportMirror> {
        let pool = self.db_pool.clone()?;
        let service = self.service.clone();
        Some(Arc::new(move |job, now| {
            let pool = pool.clone();
            let service = service.clone();
            tokio::spawn(async move {
                if let Err(e) = crate::db::exports::upsert(&pool, &job).await {
                    tracing::error!(job_id = %job.id, error = %e, "failed to mirror export job to database");
                }
                for event in service.audit().recorded_at(now) {
                    if let Err(e) = crate::db::audit::append(&pool, &event).await {
                        tracing::error!(error = %e, "failed to mirror audit event to database");
                    }
                }
            });
        }))
    }
}
