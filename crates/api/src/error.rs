use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kidstory_core::error::CoreError;
use kidstory_core::upstream::{UpstreamError, UpstreamErrorKind};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`UpstreamError`] for failures
/// of synchronous calls to the hosted API. Implements [`IntoResponse`] to
/// produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `kidstory_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A classified failure from the hosted chat / image API.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A third-party server (other than the hosted API) misbehaved.
    #[error("Bad gateway: {0}")]
    BadGateway(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
            },

            // --- Hosted API errors ---
            AppError::Upstream(err) => {
                tracing::warn!(kind = ?err.kind, error = %err, "Upstream call failed");
                (
                    upstream_status(err.kind),
                    err.kind.code(),
                    err.kind.user_message().to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::BadGateway(msg) => {
                tracing::warn!(error = %msg, "Bad gateway");
                (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg.clone())
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// HTTP status reported for each upstream failure category.
///
/// - Rate limiting is passed through as 429 so clients back off.
/// - An exhausted quota is a service outage from the client's view (503).
/// - Our own deadline is a gateway timeout (504).
/// - Credential problems are ours, not the client's, hence 502.
fn upstream_status(kind: UpstreamErrorKind) -> StatusCode {
    match kind {
        UpstreamErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        UpstreamErrorKind::Quota => StatusCode::SERVICE_UNAVAILABLE,
        UpstreamErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        UpstreamErrorKind::Auth | UpstreamErrorKind::Other => StatusCode::BAD_GATEWAY,
    }
}
