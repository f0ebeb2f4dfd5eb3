use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs currently retained in memory (pending or finished).
    pub tracked_jobs: usize,
    /// Whether an upstream API key is configured.
    pub upstream_configured: bool,
}

/// GET /health -- returns service health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let upstream_configured = !state.config.openai_api_key.is_empty();

    Json(HealthResponse {
        status: if upstream_configured { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        tracked_jobs: state.images.tracker().job_count().await,
        upstream_configured,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
