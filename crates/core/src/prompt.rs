//! Prompt policy for image generation.
//!
//! Requests are validated against [`MAX_PROMPT_CHARS`]; what is sent
//! upstream is the trimmed prompt cut to [`UPSTREAM_PROMPT_CHARS`] and
//! prefixed with [`CHILD_FRIENDLY_PREFIX`].

use crate::error::CoreError;

/// Longest prompt a client may submit.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Longest user-provided portion forwarded to the image API.
pub const UPSTREAM_PROMPT_CHARS: usize = 800;

/// Directive prepended to every image prompt.
pub const CHILD_FRIENDLY_PREFIX: &str = "Child-friendly illustration: ";

/// Reject empty prompts and prompts over [`MAX_PROMPT_CHARS`] characters.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".into()));
    }
    let len = trimmed.chars().count();
    if len > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt must be at most {MAX_PROMPT_CHARS} characters (got {len})"
        )));
    }
    Ok(())
}

/// Cut `s` to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The prompt as it is sent to the image API.
pub fn upstream_prompt(prompt: &str) -> String {
    format!(
        "{CHILD_FRIENDLY_PREFIX}{}",
        truncate_chars(prompt.trim(), UPSTREAM_PROMPT_CHARS)
    )
}

/// Cache-key form of a prompt: trimmed and case-folded.
pub fn normalize(prompt: &str) -> String {
    prompt.trim().to_lowercase()
}
