//! # Export Operations API
//!
//! Export job enqueueing, polling, and artifact retrieval. Jobs are
//! processed by the background worker pool; the request path only queues
//! and reads. Download handles are only issued for COMPLETED jobs.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use av_core::{ControlId, ExportJobId, PackId, Timestamp};
use av_export::{artifact_object_key, DownloadHandle};
use av_model::{ExportJob, ExportKind, ExportStatus};
use av_store::EXPORTS_BUCKET;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::PaginationParams;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/exports/control/:id", post(enqueue_control_export))
        .route("/v1/exports/section/:code", post(enqueue_section_export))
        .route("/v1/exports/full", post(enqueue_full_export))
        .route("/v1/exports", get(list_exports))
        .route("/v1/exports/:job_id", get(get_export))
        .route("/v1/exports/:job_id/download", get(export_download))
        .route("/v1/exports/:job_id/artifact", get(export_artifact))
}

/// Pack scope for section and full-pack exports.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PackScopeRequest {
    pub pack_id: Uuid,
}

impl Validate for PackScopeRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

async fn enqueue(
    state: &AppState,
    kind: ExportKind,
    actor: &str,
) -> Result<(StatusCode, Json<ExportJob>), AppError> {
    let now = Timestamp::now();
    let job = state.service.enqueue_export(kind, actor, now)?;
    state.mirror_export(&job).await?;
    state.mirror_audit(now).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// POST /v1/exports/control/:id — queue a single-control export.
#[utoipa::path(
    post,
    path = "/v1/exports/control/{id}",
    params(("id" = Uuid, Path, description = "Control ID")),
    responses(
        (status = 202, description = "Job queued", body = ExportJob),
        (status = 404, description = "Control not found", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
async fn enqueue_control_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    caller: CallerIdentity,
) -> Result<(StatusCode, Json<ExportJob>), AppError> {
    enqueue(
        &state,
        ExportKind::ControlPdf {
            control_id: ControlId::from(id),
        },
        &caller.actor,
    )
    .await
}

/// POST /v1/exports/section/:code — queue a section export for a pack.
#[utoipa::path(
    post,
    path = "/v1/exports/section/{code}",
    params(("code" = String, Path, description = "Section code")),
    request_body = PackScopeRequest,
    responses(
        (status = 202, description = "Job queued", body = ExportJob),
        (status = 404, description = "Pack not found", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
async fn enqueue_section_export(
    State(state): State<AppState>,
    Path(code): Path<String>,
    caller: CallerIdentity,
    body: Result<Json<PackScopeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExportJob>), AppError> {
    let req = extract_validated_json(body)?;
    enqueue(
        &state,
        ExportKind::SectionPack {
            pack_id: PackId::from(req.pack_id),
            section_code: code,
        },
        &caller.actor,
    )
    .await
}

/// POST /v1/exports/full — queue a full-pack export.
#[utoipa::path(
    post,
    path = "/v1/exports/full",
    request_body = PackScopeRequest,
    responses(
        (status = 202, description = "Job queued", body = ExportJob),
        (status = 404, description = "Pack not found", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
async fn enqueue_full_export(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<PackScopeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExportJob>), AppError> {
    let req = extract_validated_json(body)?;
    enqueue(
        &state,
        ExportKind::FullPack {
            pack_id: PackId::from(req.pack_id),
        },
        &caller.actor,
    )
    .await
}

/// Filters for the export job listing.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ExportListParams {
    /// Restrict to jobs scoped to this control.
    pub control_id: Option<Uuid>,
    /// Restrict to jobs scoped to this pack.
    pub pack_id: Option<Uuid>,
    /// Restrict to a status (QUEUED, RUNNING, COMPLETED, FAILED).
    pub status: Option<ExportStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn matches_filter(job: &ExportJob, params: &ExportListParams) -> bool {
    if let Some(status) = params.status {
        if job.status != status {
            return false;
        }
    }
    if let Some(control) = params.control_id {
        match &job.kind {
            ExportKind::ControlPdf { control_id } if *control_id.as_uuid() == control => {}
            _ => return false,
        }
    }
    if let Some(pack) = params.pack_id {
        match &job.kind {
            ExportKind::SectionPack { pack_id, .. } | ExportKind::FullPack { pack_id }
                if *pack_id.as_uuid() == pack => {}
            _ => return false,
        }
    }
    true
}

/// GET /v1/exports — list and poll export jobs, newest first.
#[utoipa::path(
    get,
    path = "/v1/exports",
    params(
        ("control_id" = Option<Uuid>, Query, description = "Filter by control scope"),
        ("pack_id" = Option<Uuid>, Query, description = "Filter by pack scope"),
        ("status" = Option<String>, Query, description = "Filter by job status"),
        ("limit" = Option<usize>, Query, description = "Max items to return (default 100, max 1000)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "Matching jobs", body = Vec<ExportJob>),
    ),
    tag = "exports"
)]
async fn list_exports(
    State(state): State<AppState>,
    Query(params): Query<ExportListParams>,
) -> Json<Vec<ExportJob>> {
    let pagination = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let mut jobs: Vec<ExportJob> = state
        .service
        .registry()
        .exports
        .list()
        .into_iter()
        .filter(|job| matches_filter(job, &params))
        .collect();
    jobs.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
    let offset = pagination.effective_offset().min(jobs.len());
    let page = jobs
        .into_iter()
        .skip(offset)
        .take(pagination.effective_limit())
        .collect();
    Json(page)
}

/// GET /v1/exports/:job_id — poll a single job.
#[utoipa::path(
    get,
    path = "/v1/exports/{job_id}",
    params(("job_id" = Uuid, Path, description = "Export job ID")),
    responses(
        (status = 200, description = "Job record", body = ExportJob),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
async fn get_export(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ExportJob>, AppError> {
    Ok(Json(find_job(&state, job_id)?))
}

/// GET /v1/exports/:job_id/download — time-limited artifact handle.
///
/// 409 NOT_READY until the job reaches COMPLETED. Expired handles are
/// re-requested, never renewed.
#[utoipa::path(
    get,
    path = "/v1/exports/{job_id}/download",
    params(("job_id" = Uuid, Path, description = "Export job ID")),
    responses(
        (status = 200, description = "Download handle", body = DownloadHandle),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody),
        (status = 409, description = "Job not COMPLETED yet", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
async fn export_download(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<DownloadHandle>, AppError> {
    let job = find_job(&state, job_id)?;
    let handle = DownloadHandle::for_job(&job, Timestamp::now())?;
    Ok(Json(handle))
}

/// GET /v1/exports/:job_id/artifact — the artifact bytes.
#[utoipa::path(
    get,
    path = "/v1/exports/{job_id}/artifact",
    params(("job_id" = Uuid, Path, description = "Export job ID")),
    responses(
        (status = 200, description = "Artifact bytes", content_type = "application/json"),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody),
        (status = 409, description = "Job not COMPLETED yet", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
async fn export_artifact(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let job = find_job(&state, job_id)?;
    if job.status != ExportStatus::Completed {
        return Err(AppError::NotReady(format!(
            "export job {} is {}",
            job.id, job.status
        )));
    }
    // The canonical JSON renderer is the only one the worker pool runs with.
    let key = artifact_object_key(&state.service, &job, "json")?;
    let bytes = state.service.blobs().get(EXPORTS_BUCKET, &key)?;
    let headers = [(header::CONTENT_TYPE, "application/json".to_string())];
    Ok((headers, bytes).into_response())
}

fn find_job(state: &AppState, job_id: Uuid) -> Result<ExportJob, AppError> {
    let id = ExportJobId::from(job_id);
    state
        .service
        .registry()
        .exports
        .get(id.as_uuid())
        .ok_or_else(|| AppError::NotFound(format!("export job {id}")))
}
