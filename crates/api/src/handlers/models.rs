use axum::Json;
use kidstory_core::models::{ModelInfo, MODELS};

use crate::response::DataResponse;

/// GET /models
///
/// Lists the chat and image models the service accepts.
pub async fn list_models() -> Json<DataResponse<&'static [ModelInfo]>> {
    Json(DataResponse { data: MODELS })
}
