//! Handlers for reading image job outcomes.
//!
//! Routes:
//! - `GET /job-status?id=` -- non-blocking status poll
//! - `GET /job-events?id=` -- server-sent events, at most one terminal event

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{Stream, StreamExt};
use kidstory_core::error::CoreError;
use kidstory_core::job::{ImageResult, JobId, JobOutcome, JobStatus};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query string shared by the status and events endpoints.
#[derive(Debug, Deserialize)]
pub struct JobQuery {
    /// Job id as returned by `/generate-image`. `processId` is accepted
    /// for older clients.
    #[serde(alias = "processId")]
    pub id: Option<String>,
}

impl JobQuery {
    fn job_id(&self) -> AppResult<JobId> {
        let raw = self
            .id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Job id is required".into()))?;
        Ok(raw.parse()?)
    }
}

/// Wire form of a job's state, shared by polling and the event stream.
///
/// ```text
/// {"status":"processing"}
/// {"status":"completed","data":{"imageUrl":"https://..."}}
/// {"status":"failed","error":"...","code":"UPSTREAM_RATE_LIMIT"}
/// ```
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatusResponse {
    Processing,
    Completed { data: ImageResult },
    Failed { error: String, code: &'static str },
}

impl From<JobOutcome> for JobStatusResponse {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed(data) => Self::Completed { data },
            JobOutcome::Failed { error, kind } => Self::Failed {
                error,
                code: kind.code(),
            },
        }
    }
}

/// GET /job-status?id={jobId}
///
/// Finished jobs answer with the same outcome on every poll until their
/// retention window passes; after that the id is unknown (404).
pub async fn job_status(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> AppResult<impl IntoResponse> {
    let job_id = query.job_id()?;

    let response = match state.images.tracker().poll_status(job_id).await {
        JobStatus::Pending => JobStatusResponse::Processing,
        JobStatus::Completed(data) => JobStatusResponse::Completed { data },
        JobStatus::Failed { error, kind } => JobStatusResponse::Failed {
            error,
            code: kind.code(),
        },
        JobStatus::Unknown => {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            }))
        }
    };

    Ok(Json(response))
}

/// GET /job-events?id={jobId}
///
/// Opens a server-sent event stream that emits one `completed` or `failed`
/// event carrying the [`JobStatusResponse`] payload and then ends. If the
/// job does not finish within the push timeout the stream ends without an
/// event.
pub async fn job_events(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let job_id = query.job_id()?;
    let channel = state.images.tracker().open_push_channel(job_id).await?;
    tracing::debug!(job_id = %job_id, "Push channel opened");

    let events = channel.into_stream().map(move |outcome| {
        tracing::debug!(job_id = %job_id, "Delivering job outcome over push channel");
        Ok(outcome_event(outcome))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn outcome_event(outcome: JobOutcome) -> Event {
    let name = match outcome {
        JobOutcome::Completed(_) => "completed",
        JobOutcome::Failed { .. } => "failed",
    };
    let payload = JobStatusResponse::from(outcome);
    let data = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(data)
}
