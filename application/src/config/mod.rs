//! Application-level configuration.
//!
//! - [`AgentConfig`] / [`Injected`] — caller fields and infrastructure handles
//! - [`ConfigBuilder`] — add-if-absent merging, child propagation, validation
//! - [`RetryPolicy`] — per-model query retry with exponential backoff

pub mod agent_config;
pub mod builder;
pub mod retry_policy;

pub use agent_config::{AgentConfig, DEFAULT_ROUND_RETRIES, Injected};
pub use builder::{ConfigBuilder, ConfigError};
pub use retry_policy::RetryPolicy;
