//! Image-generation job records and their lifecycle.
//!
//! A job starts [`JobState::Pending`] and is settled exactly once into
//! either [`JobState::Completed`] or [`JobState::Failed`]. Terminal states
//! are final; [`Job::settle`] refuses a second transition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::Timestamp;
use crate::upstream::{UpstreamError, UpstreamErrorKind};

// ---------------------------------------------------------------------------
// Status strings (wire format)
// ---------------------------------------------------------------------------

/// Job has been accepted and is still running.
pub const STATUS_PROCESSING: &str = "processing";
/// Job finished with an image.
pub const STATUS_COMPLETED: &str = "completed";
/// Job finished with an error.
pub const STATUS_FAILED: &str = "failed";

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Opaque job identifier handed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| CoreError::Validation(format!("Invalid job id '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// State and outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Payload of a successfully generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub image_url: String,
}

/// Terminal result of a job, as delivered to pollers and push subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(ImageResult),
    Failed {
        error: String,
        kind: UpstreamErrorKind,
    },
}

impl JobOutcome {
    pub fn completed(image_url: impl Into<String>) -> Self {
        Self::Completed(ImageResult {
            image_url: image_url.into(),
        })
    }

    pub fn failed(error: impl Into<String>, kind: UpstreamErrorKind) -> Self {
        Self::Failed {
            error: error.into(),
            kind,
        }
    }

    pub fn state(&self) -> JobState {
        match self {
            Self::Completed(_) => JobState::Completed,
            Self::Failed { .. } => JobState::Failed,
        }
    }
}

impl From<Result<String, UpstreamError>> for JobOutcome {
    fn from(result: Result<String, UpstreamError>) -> Self {
        match result {
            Ok(url) => Self::completed(url),
            Err(e) => Self::failed(e.message, e.kind),
        }
    }
}

/// What a status poll observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed(ImageResult),
    Failed {
        error: String,
        kind: UpstreamErrorKind,
    },
    /// Never issued, or evicted after its retention window.
    Unknown,
}

impl From<JobOutcome> for JobStatus {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed(result) => Self::Completed(result),
            JobOutcome::Failed { error, kind } => Self::Failed { error, kind },
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub prompt: String,
    pub model: String,
    pub state: JobState,
    pub result: Option<ImageResult>,
    pub error: Option<String>,
    pub error_kind: Option<UpstreamErrorKind>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            prompt: prompt.into(),
            model: model.into(),
            state: JobState::Pending,
            result: None,
            error: None,
            error_kind: None,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    /// Move the job into the terminal state described by `outcome`.
    ///
    /// Fails with [`CoreError::Conflict`] if the job is already terminal, in
    /// which case the record is left untouched.
    pub fn settle(&mut self, outcome: &JobOutcome) -> Result<(), CoreError> {
        if self.state.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Job {} has already finished",
                self.id
            )));
        }

        match outcome {
            JobOutcome::Completed(result) => self.result = Some(result.clone()),
            JobOutcome::Failed { error, kind } => {
                self.error = Some(error.clone());
                self.error_kind = Some(*kind);
            }
        }
        self.state = outcome.state();
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// The terminal outcome, or `None` while still pending.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match self.state {
            JobState::Pending => None,
            JobState::Completed => self.result.clone().map(JobOutcome::Completed),
            JobState::Failed => Some(JobOutcome::Failed {
                error: self.error.clone().unwrap_or_default(),
                kind: self.error_kind.unwrap_or(UpstreamErrorKind::Other),
            }),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.outcome().map_or(JobStatus::Pending, JobStatus::from)
    }
}
