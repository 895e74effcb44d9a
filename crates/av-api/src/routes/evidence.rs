//! # Evidence Operations API
//!
//! Evidence item creation, file uploads (raw body), and time-limited file
//! download handles. File bytes are served through the content route the
//! handle points at, integrity-checked against the stored hash on every
//! read.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use av_core::{EvidenceFileId, EvidenceId, Timestamp};
use av_export::DownloadHandle;
use av_model::{EvidenceFile, EvidenceItem};
use av_store::EvidenceDraft;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/evidence", post(create_evidence))
        .route("/v1/evidence/:id/files", post(upload_file))
        .route("/v1/files/:id/download", get(file_download))
        .route("/v1/files/:id/content", get(file_content))
}

/// Request to create an evidence item.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEvidenceRequest {
    pub title: String,
    pub category: String,
    pub subtype: Option<String>,
    pub notes: Option<String>,
    /// The date the evidenced activity happened.
    pub event_date: NaiveDate,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

impl Validate for CreateEvidenceRequest {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must be non-empty".to_string());
        }
        if self.title.len() > 512 {
            return Err("title must not exceed 512 characters".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("category must be non-empty".to_string());
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if from > until {
                return Err("valid_from must not be after valid_until".to_string());
            }
        }
        Ok(())
    }
}

/// POST /v1/evidence — create an evidence item.
#[utoipa::path(
    post,
    path = "/v1/evidence",
    request_body = CreateEvidenceRequest,
    responses(
        (status = 201, description = "Evidence item created", body = EvidenceItem),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody),
    ),
    tag = "evidence"
)]
async fn create_evidence(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateEvidenceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EvidenceItem>), AppError> {
    let req = extract_validated_json(body)?;
    let now = Timestamp::now();
    let item = state.service.create_evidence(
        EvidenceDraft {
            title: req.title,
            category: req.category,
            subtype: req.subtype,
            notes: req.notes,
            event_date: req.event_date,
            valid_from: req.valid_from,
            valid_until: req.valid_until,
        },
        &caller.actor,
        now,
    )?;
    state.mirror_audit(now).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /v1/evidence/:id/files — upload a file against an evidence item.
///
/// The file arrives as the raw request body; the filename comes from the
/// `x-filename` header and the content type from `content-type`. The blob
/// is content-hashed on write and the hash recorded for integrity checks
/// on every read.
#[utoipa::path(
    post,
    path = "/v1/evidence/{id}/files",
    params(
        ("id" = Uuid, Path, description = "Evidence item ID"),
        ("x-filename" = String, Header, description = "Original filename"),
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "File stored", body = EvidenceFile),
        (status = 404, description = "Evidence item not found", body = crate::error::ErrorBody),
        (status = 422, description = "Missing filename or empty body", body = crate::error::ErrorBody),
    ),
    tag = "evidence"
)]
async fn upload_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    caller: CallerIdentity,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<EvidenceFile>), AppError> {
    let filename = headers
        .get("x-filename")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("x-filename header is required".to_string()))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let now = Timestamp::now();
    let file = state.service.upload_file(
        EvidenceId::from(id),
        filename,
        content_type,
        &body,
        &caller.actor,
        now,
    )?;
    state.mirror_audit(now).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// GET /v1/files/:id/download — time-limited download handle.
///
/// Handles expire after 600 seconds and are re-requested, never renewed.
#[utoipa::path(
    get,
    path = "/v1/files/{id}/download",
    params(("id" = Uuid, Path, description = "Evidence file ID")),
    responses(
        (status = 200, description = "Download handle", body = DownloadHandle),
        (status = 404, description = "File not found", body = crate::error::ErrorBody),
    ),
    tag = "evidence"
)]
async fn file_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DownloadHandle>, AppError> {
    let file_id = EvidenceFileId::from(id);
    if !state.service.registry().files.contains(file_id.as_uuid()) {
        return Err(AppError::NotFound(format!("file {file_id}")));
    }
    let handle = DownloadHandle::for_path(format!("/v1/files/{file_id}/content"), Timestamp::now());
    Ok(Json(handle))
}

/// GET /v1/files/:id/content — the file bytes.
///
/// The read recomputes the blob's hash against the stored record; a
/// mismatch surfaces as 500 rather than serving tampered content.
#[utoipa::path(
    get,
    path = "/v1/files/{id}/content",
    params(("id" = Uuid, Path, description = "Evidence file ID")),
    responses(
        (status = 200, description = "File bytes", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = crate::error::ErrorBody),
    ),
    tag = "evidence"
)]
async fn file_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (file, bytes) = state.service.read_file(EvidenceFileId::from(id))?;
    let headers = [
        (header::CONTENT_TYPE, file.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.filename),
        ),
    ];
    Ok((headers, bytes).into_response())
}
