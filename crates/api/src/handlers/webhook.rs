//! Completion webhook for generation that runs out of process.
//!
//! Routes:
//! - `POST /job-webhook` -- settle a pending job (requires `x-webhook-secret`)

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use kidstory_core::job::{JobId, JobOutcome};
use kidstory_core::upstream::UpstreamErrorKind;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::webhook::WebhookAuth;
use crate::state::AppState;

/// Body posted by an external generator once it has a result.
///
/// A non-empty `error` fails the job; otherwise `image_url` is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobWebhookPayload {
    #[serde(alias = "processId")]
    pub job_id: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobWebhookPayload {
    fn outcome(self) -> AppResult<(JobId, JobOutcome)> {
        let job_id: JobId = self.job_id.parse()?;
        let error = self.error.filter(|e| !e.trim().is_empty());
        let url = self.image_url.filter(|u| !u.trim().is_empty());
        let outcome = match (error, url) {
            (Some(error), _) => JobOutcome::failed(error, UpstreamErrorKind::Other),
            (None, Some(url)) => JobOutcome::completed(url.trim()),
            (None, None) => {
                return Err(AppError::BadRequest(
                    "Either imageUrl or error is required".into(),
                ))
            }
        };
        Ok((job_id, outcome))
    }
}

#[derive(Debug, Serialize)]
pub struct JobWebhookResponse {
    pub success: bool,
}

/// POST /job-webhook
///
/// Settles the referenced job exactly as the in-process generation would
/// have, waking any open push channels. Unknown jobs yield 404 and jobs
/// that already finished yield 409.
pub async fn job_webhook(
    _auth: WebhookAuth,
    State(state): State<AppState>,
    Json(input): Json<JobWebhookPayload>,
) -> AppResult<impl IntoResponse> {
    let (job_id, outcome) = input.outcome()?;

    state.images.complete_external(job_id, outcome).await?;
    tracing::info!(job_id = %job_id, "Job settled via webhook");

    Ok(Json(JobWebhookResponse { success: true }))
}
