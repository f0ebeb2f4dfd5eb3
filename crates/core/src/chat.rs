//! Conversation messages exchanged with the chat model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// System prompt used when a conversation does not bring its own.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a warm, imaginative storyteller for children. \
Keep stories short, gentle and age appropriate, and never include frightening or unsafe content.";

/// Upper bound on messages forwarded in one chat request.
pub const MAX_CONVERSATION_MESSAGES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(CoreError::Validation(format!(
                "Invalid message role '{other}'. Must be one of: system, user, assistant"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Check that a conversation can be forwarded to the chat model.
pub fn validate_conversation(messages: &[ChatMessage]) -> Result<(), CoreError> {
    if messages.is_empty() {
        return Err(CoreError::Validation(
            "A valid, non-empty messages array is required".into(),
        ));
    }
    if messages.len() > MAX_CONVERSATION_MESSAGES {
        return Err(CoreError::Validation(format!(
            "At most {MAX_CONVERSATION_MESSAGES} messages may be sent at once"
        )));
    }
    if !messages.iter().any(|m| m.role == ChatRole::User) {
        return Err(CoreError::Validation(
            "The conversation must contain at least one user message".into(),
        ));
    }
    Ok(())
}

/// Prepend [`DEFAULT_SYSTEM_PROMPT`] unless the conversation already starts
/// with a system message.
pub fn with_default_system_prompt(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let has_system = messages.first().is_some_and(|m| m.role == ChatRole::System);
    if !has_system {
        messages.insert(0, ChatMessage::new(ChatRole::System, DEFAULT_SYSTEM_PROMPT));
    }
    messages
}
