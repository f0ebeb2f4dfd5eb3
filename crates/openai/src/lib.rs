//! Client for the hosted chat and image generation API.
//!
//! - [`api::OpenAiApi`] wraps the raw HTTP endpoints.
//! - [`provider`] defines the [`ImageGenerator`] and [`ChatCompleter`]
//!   seams the rest of the system depends on, plus the production
//!   [`OpenAiProvider`] implementing both.

pub mod api;
pub mod messages;
pub mod provider;

pub use api::{OpenAiApi, OpenAiApiError};
pub use provider::{ChatCompleter, ImageGenerator, OpenAiProvider};
