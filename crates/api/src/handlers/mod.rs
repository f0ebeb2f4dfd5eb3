pub mod chat;
pub mod download;
pub mod images;
pub mod jobs;
pub mod models;
pub mod webhook;
