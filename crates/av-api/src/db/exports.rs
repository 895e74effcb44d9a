//! Export job persistence.
//!
//! One row per job, updated in place as the job moves through its
//! lifecycle. The kind is stored as its JSON representation so the scope
//! (control, section, pack) round-trips without a bespoke schema.

use sqlx::PgPool;

use av_model::ExportJob;

/// Insert or update an export job record by id.
pub async fn upsert(pool: &PgPool, job: &ExportJob) -> Result<(), sqlx::Error> {
    let kind = serde_json::to_value(&job.kind)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize export kind: {e}")))?;

    sqlx::query(
        "INSERT INTO export_jobs (id, kind, status, requested_by, requested_at,
         started_at, finished_at, artifact_sha256, artifact_size, error_text)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (id) DO UPDATE SET
           status = EXCLUDED.status,
           started_at = EXCLUDED.started_at,
           finished_at = EXCLUDED.finished_at,
           artifact_sha256 = EXCLUDED.artifact_sha256,
           artifact_size = EXCLUDED.artifact_size,
           error_text = EXCLUDED.error_text",
    )
    .bind(*job.id.as_uuid())
    .bind(&kind)
    .bind(job.status.as_str())
    .bind(&job.requested_by)
    .bind(*job.requested_at.as_datetime())
    .bind(job.started_at.map(|t| *t.as_datetime()))
    .bind(job.finished_at.map(|t| *t.as_datetime()))
    .bind(job.artifact_digest.as_ref().map(|d| d.to_hex()))
    .bind(job.artifact_size.map(|s| s as i64))
    .bind(&job.error)
    .execute(pool)
    .await?;

    Ok(())
}
