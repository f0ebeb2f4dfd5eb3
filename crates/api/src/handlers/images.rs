//! Handler for image generation submission.
//!
//! Routes:
//! - `POST /generate-image` -- accept a prompt, return a job id immediately

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kidstory_core::job::JobId;
use kidstory_jobs::ImageRequest;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub job_id: JobId,
}

/// POST /generate-image
///
/// Validates the prompt and model, registers a pending job and starts the
/// generation in the background. Responds `202 Accepted` with the job id;
/// the outcome is read through `/job-status` or `/job-events`.
pub async fn generate_image(
    State(state): State<AppState>,
    Json(input): Json<GenerateImageRequest>,
) -> AppResult<impl IntoResponse> {
    let job_id = state
        .images
        .submit(ImageRequest {
            prompt: input.prompt,
            model: input.model,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateImageResponse { job_id }),
    ))
}
