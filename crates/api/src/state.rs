use std::sync::Arc;

use kidstory_jobs::ImageJobService;
use kidstory_openai::ChatCompleter;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (webhook secret, limits).
    pub config: Arc<ServerConfig>,
    /// Image job submission, tracking, cache and pacing.
    pub images: ImageJobService,
    /// Chat completion provider.
    pub chat: Arc<dyn ChatCompleter>,
    /// Plain HTTP client used by the download proxy.
    pub http: reqwest::Client,
}
