//! Error taxonomy for calls to the hosted chat / image API.
//!
//! The hosted API reports failures as an HTTP status plus a free-form
//! message body. [`classify`] folds those into a small set of categories
//! that the rest of the system (job records, HTTP responses) reports on.

use std::time::Duration;

use serde::Serialize;

/// Category of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpstreamErrorKind {
    /// Missing or rejected API credential.
    Auth,
    /// The upstream asked us to slow down.
    RateLimit,
    /// The account has run out of credit.
    Quota,
    /// Our own deadline expired before the upstream answered.
    Timeout,
    /// Anything else (network failure, 5xx, malformed response).
    Other,
}

impl UpstreamErrorKind {
    /// Stable machine-readable code used in API responses.
    pub fn code(self) -> &'static str {
        match self {
            Self::Auth => "UPSTREAM_AUTH",
            Self::RateLimit => "UPSTREAM_RATE_LIMIT",
            Self::Quota => "UPSTREAM_QUOTA",
            Self::Timeout => "TIMEOUT",
            Self::Other => "UPSTREAM_ERROR",
        }
    }

    /// Message safe to show to an end user.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Auth => "The AI service credential is invalid or missing",
            Self::RateLimit => "Too many requests were sent. Please wait a moment and try again",
            Self::Quota => "The AI service quota has been used up",
            Self::Timeout => "The AI service took too long to answer",
            Self::Other => "Something went wrong while talking to the AI service",
        }
    }
}

/// A classified failure from the hosted API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Deadline expiry while waiting on the upstream.
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            UpstreamErrorKind::Timeout,
            format!("Upstream call timed out after {}s", after.as_secs()),
        )
    }

    /// Build an error whose category is derived from `status` and `message`.
    pub fn classified(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify(status, &message),
            message,
        }
    }
}

/// Categorize an upstream failure.
///
/// A 401 status or a message mentioning an API key is an auth failure.
/// `insufficient_quota` wins over the generic 429 rate-limit mapping because
/// the upstream reports exhausted credit with a 429 as well.
pub fn classify(status: Option<u16>, message: &str) -> UpstreamErrorKind {
    let lower = message.to_lowercase();

    if status == Some(401) || lower.contains("api key") {
        UpstreamErrorKind::Auth
    } else if lower.contains("insufficient_quota") {
        UpstreamErrorKind::Quota
    } else if status == Some(429) || lower.contains("rate limit") {
        UpstreamErrorKind::RateLimit
    } else {
        UpstreamErrorKind::Other
    }
}
