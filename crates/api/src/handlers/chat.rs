//! Handler for chat completions.
//!
//! Routes:
//! - `POST /chat` -- forward a conversation to the chat model

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use kidstory_core::chat::{self, ChatMessage, ChatRole};
use kidstory_core::models;
use serde::Deserialize;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatRequestMessage>,
    #[serde(default)]
    pub model: Option<String>,
}

/// A message as sent by the client; the role is checked before forwarding.
#[derive(Debug, Deserialize)]
pub struct ChatRequestMessage {
    pub role: String,
    pub content: String,
}

/// POST /chat
///
/// Validates the conversation, prepends the storyteller system prompt when
/// the client did not send one, and returns the assistant's reply as
/// `{ "role": "assistant", "content": "..." }`.
pub async fn chat(
    State(state): State<AppState>,
    Json(input): Json<ChatRequest>,
) -> AppResult<impl IntoResponse> {
    let messages = input
        .messages
        .into_iter()
        .map(|m| -> AppResult<ChatMessage> {
            Ok(ChatMessage::new(m.role.parse::<ChatRole>()?, m.content))
        })
        .collect::<AppResult<Vec<_>>>()?;

    chat::validate_conversation(&messages)?;
    let model = models::resolve_chat_model(input.model.as_deref())?;
    let messages = chat::with_default_system_prompt(messages);

    let reply = state.chat.complete_chat(model, &messages).await?;
    tracing::debug!(model, turns = messages.len(), "Chat completion returned");

    Ok(Json(reply))
}
