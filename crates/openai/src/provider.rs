//! Provider traits for the hosted chat and image API.
//!
//! The job machinery and the HTTP handlers depend on these traits rather
//! than on [`OpenAiApi`] directly, so tests can substitute in-process fakes.

use async_trait::async_trait;
use kidstory_core::chat::ChatMessage;
use kidstory_core::upstream::UpstreamError;

use crate::api::OpenAiApi;
use crate::messages::{ChatCompletionRequest, ImageGenerationRequest};

/// Default output resolution for generated images.
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// Sampling temperature for chat completions.
pub const CHAT_TEMPERATURE: f32 = 0.7;

/// Token cap for a single chat reply.
pub const CHAT_MAX_TOKENS: u32 = 1000;

/// Something that can turn a prompt into a hosted image URL.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image for `prompt` with `model`, returning its URL.
    ///
    /// `prompt` is forwarded verbatim; length policy is the caller's job.
    async fn generate_image(&self, prompt: &str, model: &str) -> Result<String, UpstreamError>;
}

/// Something that can continue a conversation.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatMessage, UpstreamError>;
}

/// Production provider backed by [`OpenAiApi`].
pub struct OpenAiProvider {
    api: OpenAiApi,
    image_size: String,
}

impl OpenAiProvider {
    pub fn new(api: OpenAiApi) -> Self {
        Self {
            api,
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
        }
    }

    /// Override the requested image resolution (e.g. `512x512`).
    pub fn with_image_size(mut self, size: impl Into<String>) -> Self {
        self.image_size = size.into();
        self
    }
}

#[async_trait]
impl ImageGenerator for OpenAiProvider {
    async fn generate_image(&self, prompt: &str, model: &str) -> Result<String, UpstreamError> {
        let request = ImageGenerationRequest {
            model,
            prompt,
            n: 1,
            size: &self.image_size,
        };

        self.api.generate_image(&request).await.map_err(|e| {
            tracing::warn!(model, error = %e, "Image generation request failed");
            UpstreamError::from(e)
        })
    }
}

#[async_trait]
impl ChatCompleter for OpenAiProvider {
    async fn complete_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatMessage, UpstreamError> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature: CHAT_TEMPERATURE,
            max_tokens: CHAT_MAX_TOKENS,
        };

        self.api.chat_completion(&request).await.map_err(|e| {
            tracing::warn!(model, error = %e, "Chat completion request failed");
            UpstreamError::from(e)
        })
    }
}
