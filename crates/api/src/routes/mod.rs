pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the API route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate-image          submit image job (POST)
/// /job-status              poll job outcome (GET ?id=)
/// /job-events              server-sent completion event (GET ?id=)
/// /job-webhook             settle job from outside the process (POST, x-webhook-secret)
///
/// /chat                    chat completion (POST)
/// /models                  supported models (GET)
/// /download                image download proxy (GET ?url=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Image jobs.
        .route("/generate-image", post(handlers::images::generate_image))
        .route("/job-status", get(handlers::jobs::job_status))
        .route("/job-events", get(handlers::jobs::job_events))
        .route("/job-webhook", post(handlers::webhook::job_webhook))
        // Chat and helpers.
        .route("/chat", post(handlers::chat::chat))
        .route("/models", get(handlers::models::list_models))
        .route("/download", get(handlers::download::download_image))
}
