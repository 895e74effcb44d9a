//! # Control Operations API
//!
//! Control listing and search, the evidence timeline, status reads and
//! forced recomputes, verification decisions, evidence linking, and the
//! notes workflow.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use av_core::{ControlId, EvidenceId, LinkId, NoteId, Timestamp};
use av_model::{
    Control, ControlNote, ControlStatus, EvidenceFile, EvidenceItem, EvidenceLink, NoteType,
    Verification,
};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::PaginationParams;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/controls", get(list_controls))
        .route("/v1/controls/:id/timeline", get(get_timeline))
        .route("/v1/controls/:id/status", get(get_status))
        .route("/v1/controls/:id/verify", post(verify_control))
        .route("/v1/controls/:id/reject", post(reject_control))
        .route("/v1/controls/:id/links", post(create_link))
        .route("/v1/controls/:id/links/:link_id", delete(delete_link))
        .route("/v1/controls/:id/notes", get(list_notes).post(create_note))
        .route("/v1/controls/:id/notes/:note_id/resolve", post(resolve_note))
        .route("/v1/controls/:id/notes/:note_id/reopen", post(reopen_note))
}

// -- Listing ------------------------------------------------------------------

/// Search parameters for the control listing.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ControlSearchParams {
    /// Restrict to a section code (the middle segment of the control code).
    pub section: Option<String>,
    /// Case-insensitive free-text match over code, section, standard,
    /// and indicator.
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn matches_search(control: &Control, params: &ControlSearchParams) -> bool {
    if let Some(section) = &params.section {
        if !control.section_code().eq_ignore_ascii_case(section) {
            return false;
        }
    }
    if let Some(q) = &params.q {
        let needle = q.to_lowercase();
        let haystack = format!(
            "{} {} {} {}",
            control.control_code, control.section, control.standard, control.indicator
        )
        .to_lowercase();
        if !haystack.contains(&needle) {
            return false;
        }
    }
    true
}

/// GET /v1/controls — list and search active controls.
#[utoipa::path(
    get,
    path = "/v1/controls",
    params(
        ("section" = Option<String>, Query, description = "Section code filter"),
        ("q" = Option<String>, Query, description = "Free-text search"),
        ("limit" = Option<usize>, Query, description = "Max items to return (default 100, max 1000)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "Matching controls", body = Vec<Control>),
    ),
    tag = "controls"
)]
async fn list_controls(
    State(state): State<AppState>,
    Query(params): Query<ControlSearchParams>,
) -> Json<Vec<Control>> {
    let pagination = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let matched: Vec<Control> = state
        .service
        .registry()
        .active_controls()
        .into_iter()
        .filter(|c| matches_search(c, &params))
        .collect();
    let offset = pagination.effective_offset().min(matched.len());
    let page = matched
        .into_iter()
        .skip(offset)
        .take(pagination.effective_limit())
        .collect();
    Json(page)
}

// -- Timeline -----------------------------------------------------------------

/// One row of a control's evidence timeline.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimelineEntryResponse {
    pub link: EvidenceLink,
    pub evidence: EvidenceItem,
    pub files: Vec<EvidenceFile>,
}

/// Control timeline response — links in link order with their evidence.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ControlTimelineResponse {
    pub control: Control,
    pub entries: Vec<TimelineEntryResponse>,
}

/// GET /v1/controls/:id/timeline — the control's evidence history.
#[utoipa::path(
    get,
    path = "/v1/controls/{id}/timeline",
    params(("id" = Uuid, Path, description = "Control ID")),
    responses(
        (status = 200, description = "Evidence timeline", body = ControlTimelineResponse),
        (status = 404, description = "Control not found", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn get_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ControlTimelineResponse>, AppError> {
    let timeline = state.service.timeline(ControlId::from(id))?;
    Ok(Json(ControlTimelineResponse {
        control: timeline.control,
        entries: timeline
            .entries
            .into_iter()
            .map(|e| TimelineEntryResponse {
                link: e.link,
                evidence: e.evidence,
                files: e.files,
            })
            .collect(),
    }))
}

// -- Status -------------------------------------------------------------------

/// Query parameters for the status read.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct StatusParams {
    /// Force a recomputation instead of serving the cache.
    pub recompute: Option<bool>,
}

/// GET /v1/controls/:id/status — cached status, optionally recomputed.
#[utoipa::path(
    get,
    path = "/v1/controls/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Control ID"),
        ("recompute" = Option<bool>, Query, description = "Force recomputation"),
    ),
    responses(
        (status = 200, description = "Computed status with rule details", body = ControlStatus),
        (status = 404, description = "Control not found", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<StatusParams>,
) -> Result<Json<ControlStatus>, AppError> {
    let control_id = ControlId::from(id);
    let now = Timestamp::now();
    let status = if params.recompute.unwrap_or(false) {
        let status = state.service.recompute(control_id, now)?;
        // A forced recompute may raise or clear alerts.
        state.mirror_audit(now).await?;
        status
    } else {
        state.service.get_status(control_id, now)?
    };
    Ok(Json(status))
}

// -- Verification -------------------------------------------------------------

/// Verification decision request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// Optional for VERIFIED, required for REJECTED.
    pub comment: Option<String>,
}

impl Validate for DecisionRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(comment) = &self.comment {
            if comment.len() > 4000 {
                return Err("comment must not exceed 4000 characters".to_string());
            }
        }
        Ok(())
    }
}

/// POST /v1/controls/:id/verify — record a VERIFIED decision.
///
/// The decision snapshots the link set as of this instant; a later link
/// mutation makes the verification stale. A concurrent decision on the
/// same control fails fast with 409.
#[utoipa::path(
    post,
    path = "/v1/controls/{id}/verify",
    params(("id" = Uuid, Path, description = "Control ID")),
    request_body = DecisionRequest,
    responses(
        (status = 201, description = "Verification recorded", body = Verification),
        (status = 404, description = "Control not found", body = crate::error::ErrorBody),
        (status = 409, description = "Concurrent decision in progress", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn verify_control(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    caller: CallerIdentity,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Verification>), AppError> {
    let req = extract_validated_json(body)?;
    let now = Timestamp::now();
    let verification = state
        .service
        .verify(ControlId::from(id), &caller.actor, req.comment, now)?;
    state.mirror_audit(now).await?;
    Ok((StatusCode::CREATED, Json(verification)))
}

/// POST /v1/controls/:id/reject — record a REJECTED decision.
#[utoipa::path(
    post,
    path = "/v1/controls/{id}/reject",
    params(("id" = Uuid, Path, description = "Control ID")),
    request_body = DecisionRequest,
    responses(
        (status = 201, description = "Rejection recorded", body = Verification),
        (status = 404, description = "Control not found", body = crate::error::ErrorBody),
        (status = 422, description = "Missing comment", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn reject_control(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    caller: CallerIdentity,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Verification>), AppError> {
    let req = extract_validated_json(body)?;
    let now = Timestamp::now();
    let verification = state
        .service
        .reject(ControlId::from(id), &caller.actor, req.comment, now)?;
    state.mirror_audit(now).await?;
    Ok((StatusCode::CREATED, Json(verification)))
}

// -- Evidence links -----------------------------------------------------------

/// Request to link an evidence item to a control.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLinkRequest {
    pub evidence_id: Uuid,
    pub relevance_note: Option<String>,
}

impl Validate for CreateLinkRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(note) = &self.relevance_note {
            if note.len() > 2000 {
                return Err("relevance_note must not exceed 2000 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Link response, flagging whether the link was newly created.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LinkResponse {
    pub link: EvidenceLink,
    /// False when the pair was already linked (idempotent duplicate).
    pub created: bool,
}

/// POST /v1/controls/:id/links — link evidence to a control.
///
/// Linking the same pair twice returns the existing link with `created:
/// false` and a 200 instead of a 201; no duplicate is written.
#[utoipa::path(
    post,
    path = "/v1/controls/{id}/links",
    params(("id" = Uuid, Path, description = "Control ID")),
    request_body = CreateLinkRequest,
    responses(
        (status = 201, description = "Evidence linked", body = LinkResponse),
        (status = 200, description = "Pair already linked", body = LinkResponse),
        (status = 404, description = "Control or evidence not found", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn create_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    caller: CallerIdentity,
    body: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let now = Timestamp::now();
    let (link, created) = state.service.link_evidence(
        ControlId::from(id),
        EvidenceId::from(req.evidence_id),
        req.relevance_note,
        &caller.actor,
        now,
    )?;
    state.mirror_audit(now).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(LinkResponse { link, created })))
}

/// DELETE /v1/controls/:id/links/:link_id — remove an evidence link.
#[utoipa::path(
    delete,
    path = "/v1/controls/{id}/links/{link_id}",
    params(
        ("id" = Uuid, Path, description = "Control ID"),
        ("link_id" = Uuid, Path, description = "Link ID"),
    ),
    responses(
        (status = 204, description = "Link removed"),
        (status = 404, description = "Link not found on this control", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn delete_link(
    State(state): State<AppState>,
    Path((id, link_id)): Path<(Uuid, Uuid)>,
    caller: CallerIdentity,
) -> Result<StatusCode, AppError> {
    let now = Timestamp::now();
    state
        .service
        .unlink_evidence(ControlId::from(id), LinkId::from(link_id), &caller.actor, now)?;
    state.mirror_audit(now).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Notes --------------------------------------------------------------------

/// Request to add a note to a control.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    pub note_type: NoteType,
    pub body: String,
}

impl Validate for CreateNoteRequest {
    fn validate(&self) -> Result<(), String> {
        if self.body.trim().is_empty() {
            return Err("note body must be non-empty".to_string());
        }
        if self.body.len() > 8000 {
            return Err("note body must not exceed 8000 characters".to_string());
        }
        Ok(())
    }
}

/// GET /v1/controls/:id/notes — the control's notes, oldest first.
#[utoipa::path(
    get,
    path = "/v1/controls/{id}/notes",
    params(("id" = Uuid, Path, description = "Control ID")),
    responses(
        (status = 200, description = "Notes on this control", body = Vec<ControlNote>),
        (status = 404, description = "Control not found", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn list_notes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ControlNote>>, AppError> {
    let control_id = ControlId::from(id);
    if !state.service.registry().controls.contains(control_id.as_uuid()) {
        return Err(AppError::NotFound(format!("control {control_id}")));
    }
    Ok(Json(state.service.registry().notes_for_control(control_id)))
}

/// POST /v1/controls/:id/notes — add a note.
///
/// An unresolved CORRECTIVE_ACTION note caps the control's status at
/// IN_PROGRESS until it is resolved.
#[utoipa::path(
    post,
    path = "/v1/controls/{id}/notes",
    params(("id" = Uuid, Path, description = "Control ID")),
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = ControlNote),
        (status = 404, description = "Control not found", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn create_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    caller: CallerIdentity,
    body: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ControlNote>), AppError> {
    let req = extract_validated_json(body)?;
    let now = Timestamp::now();
    let note = state.service.add_note(
        ControlId::from(id),
        req.note_type,
        &req.body,
        &caller.actor,
        now,
    )?;
    state.mirror_audit(now).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// POST /v1/controls/:id/notes/:note_id/resolve — resolve a note.
#[utoipa::path(
    post,
    path = "/v1/controls/{id}/notes/{note_id}/resolve",
    params(
        ("id" = Uuid, Path, description = "Control ID"),
        ("note_id" = Uuid, Path, description = "Note ID"),
    ),
    responses(
        (status = 200, description = "Note resolved", body = ControlNote),
        (status = 404, description = "Note not found", body = crate::error::ErrorBody),
        (status = 409, description = "Note already resolved", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn resolve_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(Uuid, Uuid)>,
    caller: CallerIdentity,
) -> Result<Json<ControlNote>, AppError> {
    let now = Timestamp::now();
    let note = note_on_control(&state, id, note_id)?;
    let note = state.service.resolve_note(note.id, &caller.actor, now)?;
    state.mirror_audit(now).await?;
    Ok(Json(note))
}

/// POST /v1/controls/:id/notes/:note_id/reopen — reopen a resolved note.
#[utoipa::path(
    post,
    path = "/v1/controls/{id}/notes/{note_id}/reopen",
    params(
        ("id" = Uuid, Path, description = "Control ID"),
        ("note_id" = Uuid, Path, description = "Note ID"),
    ),
    responses(
        (status = 200, description = "Note reopened", body = ControlNote),
        (status = 404, description = "Note not found", body = crate::error::ErrorBody),
        (status = 409, description = "Note is not resolved", body = crate::error::ErrorBody),
    ),
    tag = "controls"
)]
async fn reopen_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(Uuid, Uuid)>,
    caller: CallerIdentity,
) -> Result<Json<ControlNote>, AppError> {
    let now = Timestamp::now();
    let note = note_on_control(&state, id, note_id)?;
    let note = state.service.reopen_note(note.id, &caller.actor, now)?;
    state.mirror_audit(now).await?;
    Ok(Json(note))
}

/// Resolve a note id against a control, rejecting notes that belong to a
/// different control.
fn note_on_control(state: &AppState, control: Uuid, note: Uuid) -> Result<ControlNote, AppError> {
    let note_id = NoteId::from(note);
    let found = state
        .service
        .registry()
        .notes
        .get(note_id.as_uuid())
        .ok_or_else(|| AppError::NotFound(format!("note {note_id}")))?;
    if *found.control_id.as_uuid() != control {
        return Err(AppError::NotFound(format!("note {note_id}")));
    }
    Ok(found)
}
