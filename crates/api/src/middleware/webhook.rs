//! Shared-secret check for the job completion webhook.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use kidstory_core::error::CoreError;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Proof that the request carried the configured webhook secret.
///
/// Place it before any body extractor so unauthenticated requests are
/// rejected without the body ever being read:
///
/// ```ignore
/// async fn job_webhook(_auth: WebhookAuth, Json(input): Json<Payload>) -> AppResult<...>
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WebhookAuth;

impl FromRequestParts<AppState> for WebhookAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.config.webhook_secret.as_deref().ok_or_else(|| {
            tracing::warn!("Webhook called but WEBHOOK_SECRET is not configured");
            AppError::Core(CoreError::Unauthorized("Webhook is not enabled".into()))
        })?;

        let provided = parts
            .headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {WEBHOOK_SECRET_HEADER} header"
                )))
            })?;

        if !secrets_match(provided, expected) {
            tracing::warn!("Webhook rejected: secret mismatch");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid webhook secret".into(),
            )));
        }

        Ok(WebhookAuth)
    }
}

/// Compare two secrets in constant time.
///
/// Both sides are hashed first so the comparison length does not leak the
/// length of the configured secret.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}
