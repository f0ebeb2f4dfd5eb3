//! Asynchronous image-generation jobs.
//!
//! - [`JobTracker`] owns job records and the push-channel subscriber lists.
//! - [`ResultCache`] remembers recent `(prompt, model)` results for a TTL.
//! - [`Pacer`] keeps a minimum spacing between outbound generation calls.
//! - [`ImageJobService`] ties them together: submit returns a job id
//!   immediately and the generation runs in a spawned task.
//! - [`reaper`] evicts terminal jobs once their retention window has passed.

pub mod cache;
pub mod config;
pub mod generation;
pub mod pacer;
pub mod reaper;
pub mod tracker;

pub use cache::ResultCache;
pub use config::JobsConfig;
pub use generation::{ImageJobService, ImageRequest};
pub use pacer::Pacer;
pub use tracker::{JobTracker, PushChannel};
