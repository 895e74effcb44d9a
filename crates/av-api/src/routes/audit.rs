//! # Audit Query API
//!
//! Read-only access to the append-only audit log. Queries are filtered,
//! newest first, and capped server-side; there is no mutation surface.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use av_core::Timestamp;
use av_model::AuditEvent;
use av_store::AuditQuery;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/audit/events", get(query_events))
}

/// Audit query parameters. All filters are conjunctive.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct AuditQueryParams {
    /// Case-insensitive substring match on the action code.
    pub action: Option<String>,
    /// Case-insensitive substring match on the entity type.
    pub entity_type: Option<String>,
    /// Case-insensitive substring match on summary, entity id, or actor.
    pub q: Option<String>,
    /// Inclusive lower bound, RFC 3339 UTC.
    pub from: Option<String>,
    /// Inclusive upper bound, RFC 3339 UTC.
    pub to: Option<String>,
}

/// GET /v1/audit/events — filtered audit query, newest first, capped at
/// 200 rows.
#[utoipa::path(
    get,
    path = "/v1/audit/events",
    params(
        ("action" = Option<String>, Query, description = "Action code substring"),
        ("entity_type" = Option<String>, Query, description = "Entity type substring"),
        ("q" = Option<String>, Query, description = "Free-text substring"),
        ("from" = Option<String>, Query, description = "Inclusive lower bound (RFC 3339 UTC)"),
        ("to" = Option<String>, Query, description = "Inclusive upper bound (RFC 3339 UTC)"),
    ),
    responses(
        (status = 200, description = "Matching audit events", body = Vec<AuditEvent>),
        (status = 422, description = "Unparseable time bound", body = crate::error::ErrorBody),
    ),
    tag = "audit"
)]
async fn query_events(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    let from = parse_bound(params.from.as_deref())?;
    let to = parse_bound(params.to.as_deref())?;
    let filter = AuditQuery {
        action: params.action,
        entity_type: params.entity_type,
        text: params.q,
        from,
        to,
    };
    Ok(Json(state.service.audit().query(&filter)))
}

fn parse_bound(raw: Option<&str>) -> Result<Option<Timestamp>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => Timestamp::parse(s)
            .map(Some)
            .map_err(|e| AppError::Validation(format!("invalid time bound: {e}"))),
    }
}
