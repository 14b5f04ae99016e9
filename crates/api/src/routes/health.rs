use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use stemsplit_core::job::StatusCounts;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `draining` once shutdown has begun.
    pub status: &'static str,
    pub version: &'static str,
    /// Tracked jobs per status.
    pub jobs: StatusCounts,
    /// Background executions not yet finished.
    pub in_flight: usize,
}

/// GET /health -- service status and job counts.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;
    let status = if orchestrator.is_accepting() { "ok" } else { "draining" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        jobs: orchestrator.registry().counts().await,
        in_flight: orchestrator.in_flight(),
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
