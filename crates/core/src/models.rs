//! Catalog of chat and image models the service accepts.

use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Model identifiers
// ---------------------------------------------------------------------------

pub const GPT_3_5: &str = "gpt-3.5-turbo";
pub const GPT_3_5_16K: &str = "gpt-3.5-turbo-16k";
pub const GPT_4: &str = "gpt-4";
pub const GPT_4_32K: &str = "gpt-4-32k";
pub const DALL_E_2: &str = "dall-e-2";
pub const DALL_E_3: &str = "dall-e-3";

/// Model used for chat when the request does not name one.
pub const DEFAULT_CHAT_MODEL: &str = GPT_3_5;

/// Model used for image generation when the request does not name one.
pub const DEFAULT_IMAGE_MODEL: &str = DALL_E_3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Chat,
    Image,
}

/// Display metadata for one model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ModelKind,
    pub recommended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<&'static str>,
    /// Human readable list price (per 1K tokens or per image).
    pub cost: &'static str,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: GPT_3_5,
        name: "GPT-3.5",
        description: "Fast and economical general purpose model",
        kind: ModelKind::Chat,
        recommended: true,
        max_tokens: Some(4096),
        image_size: None,
        cost: "$0.002",
    },
    ModelInfo {
        id: GPT_3_5_16K,
        name: "GPT-3.5 16K",
        description: "GPT-3.5 for longer stories",
        kind: ModelKind::Chat,
        recommended: false,
        max_tokens: Some(16384),
        image_size: None,
        cost: "$0.004",
    },
    ModelInfo {
        id: GPT_4,
        name: "GPT-4",
        description: "Most capable model, for complex tasks",
        kind: ModelKind::Chat,
        recommended: false,
        max_tokens: Some(8192),
        image_size: None,
        cost: "$0.03",
    },
    ModelInfo {
        id: GPT_4_32K,
        name: "GPT-4 32K",
        description: "GPT-4 for long content",
        kind: ModelKind::Chat,
        recommended: false,
        max_tokens: Some(32768),
        image_size: None,
        cost: "$0.06",
    },
    ModelInfo {
        id: DALL_E_2,
        name: "DALL-E 2",
        description: "Quick image generation",
        kind: ModelKind::Image,
        recommended: false,
        max_tokens: None,
        image_size: Some("1024x1024"),
        cost: "$0.02",
    },
    ModelInfo {
        id: DALL_E_3,
        name: "DALL-E 3",
        description: "High quality image generation",
        kind: ModelKind::Image,
        recommended: true,
        max_tokens: None,
        image_size: Some("1024x1024"),
        cost: "$0.04",
    },
];

/// Look up a model by its identifier.
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// Resolve the model for an image request, falling back to
/// [`DEFAULT_IMAGE_MODEL`] when none (or a blank one) is given.
pub fn resolve_image_model(requested: Option<&str>) -> Result<&'static str, CoreError> {
    resolve(requested, ModelKind::Image, DEFAULT_IMAGE_MODEL)
}

/// Resolve the model for a chat request, falling back to
/// [`DEFAULT_CHAT_MODEL`].
pub fn resolve_chat_model(requested: Option<&str>) -> Result<&'static str, CoreError> {
    resolve(requested, ModelKind::Chat, DEFAULT_CHAT_MODEL)
}

fn resolve(
    requested: Option<&str>,
    kind: ModelKind,
    default: &'static str,
) -> Result<&'static str, CoreError> {
    let Some(id) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };

    match find_model(id) {
        Some(info) if info.kind == kind => Ok(info.id),
        _ => {
            let valid: Vec<&str> = MODELS
                .iter()
                .filter(|m| m.kind == kind)
                .map(|m| m.id)
                .collect();
            Err(CoreError::Validation(format!(
                "Unsupported model '{id}'. Must be one of: {}",
                valid.join(", ")
            )))
        }
    }
}
