//! # av-api — Axum HTTP Surface
//!
//! The HTTP layer over the in-memory compliance service. Handlers stay
//! thin: validation and DTO shaping here, every state change behind
//! [`av_store::ComplianceService`].
//!
//! ## API Surface
//!
//! | Prefix           | Module                 | Domain                        |
//! |------------------|------------------------|-------------------------------|
//! | `/v1/controls/*` | [`routes::controls`]   | Listing, timeline, status, verification, links, notes |
//! | `/v1/evidence/*` | [`routes::evidence`]   | Evidence items and files      |
//! | `/v1/files/*`    | [`routes::evidence`]   | Download handles and content  |
//! | `/v1/exports/*`  | [`routes::exports`]    | Export jobs and artifacts     |
//! | `/v1/alerts/*`   | [`routes::alerts`]     | Alerts and the sweep          |
//! | `/v1/audit/*`    | [`routes::audit`]      | Audit log queries             |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```
//!
//! Health probes (`/health/*`) are mounted outside the auth middleware so
//! they remain accessible without credentials.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::controls::router())
        .merge(routes::evidence::router())
        .merge(routes::exports::router())
        .merge(routes::alerts::router())
        .merge(routes::audit::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
