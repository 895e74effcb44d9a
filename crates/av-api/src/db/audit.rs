//! Audit event persistence.
//!
//! Events are append-only: the table has no update or delete path. The
//! in-memory log remains the query surface; the mirror exists so the
//! compliance trail survives restarts.

use sqlx::PgPool;

use av_model::AuditEvent;

/// Append an audit event to the mirror. Idempotent on event id, so
/// re-mirroring after a partial failure cannot duplicate rows.
pub async fn append(pool: &PgPool, event: &AuditEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (id, actor, action, entity_type, entity_id, summary, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(event.id)
    .bind(&event.actor)
    .bind(event.action.as_str())
    .bind(&event.entity_type)
    .bind(&event.entity_id)
    .bind(&event.summary)
    .bind(*event.created_at.as_datetime())
    .execute(pool)
    .await?;

    Ok(())
}
