//! # Alert Operations API
//!
//! Alert listing and the sweep entry point. The sweep recomputes status
//! and reconciles alerts for every active control; it is idempotent, so
//! running it on a timer or by hand is safe.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use av_core::Timestamp;
use av_model::{AlertType, ComplianceAlert};

use crate::error::AppError;
use crate::routes::PaginationParams;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/alerts", get(list_alerts))
        .route("/v1/alerts/sweep", post(sweep_alerts))
}

/// Filters for the alert listing.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct AlertListParams {
    /// Restrict to one control.
    pub control_id: Option<Uuid>,
    /// Restrict to an alert type (OVERDUE, NEAR_DUE).
    pub alert_type: Option<AlertType>,
    /// When true, only alerts without a cleared_at. Default true.
    pub open_only: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /v1/alerts — alert listing, newest raised first.
#[utoipa::path(
    get,
    path = "/v1/alerts",
    params(
        ("control_id" = Option<Uuid>, Query, description = "Filter by control"),
        ("alert_type" = Option<String>, Query, description = "Filter by alert type"),
        ("open_only" = Option<bool>, Query, description = "Only open alerts (default true)"),
        ("limit" = Option<usize>, Query, description = "Max items to return (default 100, max 1000)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "Matching alerts", body = Vec<ComplianceAlert>),
    ),
    tag = "alerts"
)]
async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertListParams>,
) -> Json<Vec<ComplianceAlert>> {
    let pagination = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let open_only = params.open_only.unwrap_or(true);
    let mut alerts: Vec<ComplianceAlert> = state
        .service
        .registry()
        .alerts
        .list()
        .into_iter()
        .filter(|a| !open_only || a.is_open())
        .filter(|a| {
            params
                .control_id
                .map_or(true, |c| *a.control_id.as_uuid() == c)
        })
        .filter(|a| params.alert_type.map_or(true, |t| a.alert_type == t))
        .collect();
    alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
    let offset = pagination.effective_offset().min(alerts.len());
    let page = alerts
        .into_iter()
        .skip(offset)
        .take(pagination.effective_limit())
        .collect();
    Json(page)
}

/// Outcome of a full alert sweep.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SweepResponse {
    pub controls_checked: usize,
    pub alerts_raised: usize,
    pub alerts_cleared: usize,
}

/// POST /v1/alerts/sweep — recompute and reconcile every active control.
#[utoipa::path(
    post,
    path = "/v1/alerts/sweep",
    responses(
        (status = 200, description = "Sweep outcome", body = SweepResponse),
    ),
    tag = "alerts"
)]
async fn sweep_alerts(State(state): State<AppState>) -> Result<Json<SweepResponse>, AppError> {
    let now = Timestamp::now();
    let outcome = state.service.sweep_alerts(now);
    state.mirror_audit(now).await?;
    Ok(Json(SweepResponse {
        controls_checked: outcome.controls_checked,
        alerts_raised: outcome.alerts_raised,
        alerts_cleared: outcome.alerts_cleared,
    }))
}
