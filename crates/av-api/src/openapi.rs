//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AccrediVault API — Compliance Control Lifecycle Engine",
        version = "0.3.0",
        description = "Evidence tracking, status computation, verification workflow, alerts, content-addressed exports, and the append-only audit log.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Controls
        crate::routes::controls::list_controls,
        crate::routes::controls::get_timeline,
        crate::routes::controls::get_status,
        crate::routes::controls::verify_control,
        crate::routes::controls::reject_control,
        crate::routes::controls::create_link,
        crate::routes::controls::delete_link,
        crate::routes::controls::list_notes,
        crate::routes::controls::create_note,
        crate::routes::controls::resolve_note,
        crate::routes::controls::reopen_note,
        // Evidence
        crate::routes::evidence::create_evidence,
        crate::routes::evidence::upload_file,
        crate::routes::evidence::file_download,
        crate::routes::evidence::file_content,
        // Exports
        crate::routes::exports::enqueue_control_export,
        crate::routes::exports::enqueue_section_export,
        crate::routes::exports::enqueue_full_export,
        crate::routes::exports::list_exports,
        crate::routes::exports::get_export,
        crate::routes::exports::export_download,
        crate::routes::exports::export_artifact,
        // Alerts
        crate::routes::alerts::list_alerts,
        crate::routes::alerts::sweep_alerts,
        // Audit
        crate::routes::audit::query_events,
    ),
    components(schemas(
        // Domain entities
        av_model::Control,
        av_model::EvidenceItem,
        av_model::EvidenceFile,
        av_model::EvidenceLink,
        av_model::ControlStatus,
        av_model::ComputedStatus,
        av_model::RuleHint,
        av_model::RuleResult,
        av_model::StatusDetails,
        av_model::Verification,
        av_model::VerificationStatus,
        av_model::ComplianceAlert,
        av_model::AlertType,
        av_model::ControlNote,
        av_model::NoteType,
        av_model::ExportJob,
        av_model::ExportKind,
        av_model::ExportStatus,
        av_model::AuditEvent,
        av_model::AuditAction,
        av_export::DownloadHandle,
        // Request/response DTOs
        crate::routes::controls::ControlTimelineResponse,
        crate::routes::controls::TimelineEntryResponse,
        crate::routes::controls::DecisionRequest,
        crate::routes::controls::CreateLinkRequest,
        crate::routes::controls::LinkResponse,
        crate::routes::controls::CreateNoteRequest,
        crate::routes::evidence::CreateEvidenceRequest,
        crate::routes::exports::PackScopeRequest,
        crate::routes::alerts::SweepResponse,
        // Errors
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    ))
)]
pub struct ApiDoc;

/// Router exposing the assembled spec.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_assembles() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/v1/controls"));
        assert!(spec.paths.paths.contains_key("/v1/audit/events"));
    }
}
