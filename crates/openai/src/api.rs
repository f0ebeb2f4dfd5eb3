//! REST client for the hosted chat and image endpoints.
//!
//! Wraps `POST /chat/completions` and `POST /images/generations` using
//! [`reqwest`], authenticating with a bearer API key.

use kidstory_core::chat::ChatMessage;
use kidstory_core::upstream::{UpstreamError, UpstreamErrorKind};

use crate::messages::{
    ChatCompletionRequest, ChatCompletionResponse, ImageGenerationRequest,
    ImageGenerationResponse,
};

/// Default base URL of the hosted API.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// HTTP client for the hosted API.
pub struct OpenAiApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum OpenAiApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body, which carries the error code and message.
        body: String,
    },

    /// A 2xx response did not contain the expected payload.
    #[error("API response did not contain {0}")]
    EmptyResponse(&'static str),

    /// No API key was configured, so no request was sent.
    #[error("Missing api key: OPENAI_API_KEY is not configured")]
    MissingApiKey,
}

impl From<OpenAiApiError> for UpstreamError {
    fn from(err: OpenAiApiError) -> Self {
        match err {
            OpenAiApiError::Request(e) => {
                let status = e.status().map(|s| s.as_u16());
                UpstreamError::classified(status, e.to_string())
            }
            OpenAiApiError::ApiError { status, body } => {
                UpstreamError::classified(Some(status), body)
            }
            e @ OpenAiApiError::EmptyResponse(_) => {
                UpstreamError::new(UpstreamErrorKind::Other, e.to_string())
            }
            e @ OpenAiApiError::MissingApiKey => {
                UpstreamError::new(UpstreamErrorKind::Auth, e.to_string())
            }
        }
    }
}

impl OpenAiApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base URL including the version segment, e.g.
    ///   `https://api.openai.com/v1`. A trailing slash is ignored.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, api_key)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Send a conversation and return the assistant's reply.
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<ChatMessage, OpenAiApiError> {
        let response = self
            .authorized_post("chat/completions")?
            .json(request)
            .send()
            .await?;

        let body: ChatCompletionResponse = Self::parse_response(response).await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .filter(|message| !message.content.is_empty())
            .ok_or(OpenAiApiError::EmptyResponse("a chat message"))
    }

    /// Generate a single image and return its hosted URL.
    pub async fn generate_image(
        &self,
        request: &ImageGenerationRequest<'_>,
    ) -> Result<String, OpenAiApiError> {
        let response = self
            .authorized_post("images/generations")?
            .json(request)
            .send()
            .await?;

        let body: ImageGenerationResponse = Self::parse_response(response).await?;
        body.data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or(OpenAiApiError::EmptyResponse("an image url"))
    }

    // ---- private helpers ----

    fn authorized_post(&self, path: &str) -> Result<reqwest::RequestBuilder, OpenAiApiError> {
        if self.api_key.is_empty() {
            return Err(OpenAiApiError::MissingApiKey);
        }
        Ok(self
            .client
            .post(format!("{}/{path}", self.api_url))
            .bearer_auth(&self.api_key))
    }

    /// Ensure the response has a success status code, returning an
    /// [`OpenAiApiError::ApiError`] with the status and body otherwise.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, OpenAiApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(OpenAiApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OpenAiApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
