//! Domain types and pure rules shared by every kidstory crate.
//!
//! Nothing in here performs I/O: the HTTP client lives in
//! `kidstory-openai`, the job machinery in `kidstory-jobs` and the HTTP
//! surface in `kidstory-api`.

pub mod chat;
pub mod error;
pub mod job;
pub mod models;
pub mod prompt;
pub mod types;
pub mod upstream;
