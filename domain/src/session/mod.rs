//! Model conversation domain.
//!
//! - [`entities::Message`] — a role-tagged message sent to a model
//! - [`response::QueryOptions`] — per-model request options (caching hint)
//! - [`response::ModelResponse`] — one model's raw reply and usage

pub mod entities;
pub mod response;
