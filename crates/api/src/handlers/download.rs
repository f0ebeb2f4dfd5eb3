//! Image download proxy.
//!
//! Routes:
//! - `GET /download?url=` -- fetch a generated image as an attachment

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Filename suggested to the browser.
const DOWNLOAD_FILENAME: &str = "kidstory-image.png";

/// Content type used when the image host does not send one.
const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Default cap on a proxied image body (20 MiB).
pub const DEFAULT_DOWNLOAD_MAX_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
}

/// GET /download?url={imageUrl}
///
/// The image is buffered up to `download_max_bytes` and returned with the
/// host's content type and a `Content-Disposition: attachment` header.
/// Larger bodies are rejected with 502 whether or not the host declares
/// their length.
pub async fn download_image(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<impl IntoResponse> {
    let raw = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Image url is required".into()))?;

    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid image url: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::BadRequest(
            "Image url must use http or https".into(),
        ));
    }

    let response = state
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::BadGateway(format!("Image fetch failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::BadGateway(format!(
            "Image host returned HTTP {}",
            response.status().as_u16()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let bytes = read_capped(response, state.config.download_max_bytes).await?;

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename={DOWNLOAD_FILENAME}"),
            ),
        ],
        bytes,
    ))
}

/// Read the response body into memory, failing once it exceeds `max_bytes`.
async fn read_capped(mut response: reqwest::Response, max_bytes: usize) -> AppResult<Vec<u8>> {
    let too_large = || AppError::BadGateway(format!("Image exceeds {max_bytes} bytes"));

    if response
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err(too_large());
    }

    let mut buf = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::BadGateway(format!("Image fetch failed: {e}")))?
    {
        if buf.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
