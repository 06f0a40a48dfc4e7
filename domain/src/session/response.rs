//! Model query options and responses.
//!
//! These are the value objects exchanged with the model gateway port:
//! [`QueryOptions`] go out with every request, [`ModelResponse`] comes back
//! for every model that answered.

use crate::core::model::ModelId;
use serde::{Deserialize, Serialize};

/// Provider-side prompt caching directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheControl {
    /// Ask the provider to cache the prompt prefix.
    #[default]
    Ephemeral,
}

/// Per-model options for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QueryOptions {
    /// Caching directive. Consensus rounds always set this.
    pub cache_control: Option<CacheControl>,
    /// Maximum tokens the model may generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Marks requests issued in test mode (scripted backends may inspect it).
    pub test_mode: bool,
}

impl QueryOptions {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

/// Token counts reported by a backend for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UsageRecord {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl UsageRecord {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Raw reply of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub model: ModelId,
    pub content: String,
    pub usage: Option<UsageRecord>,
}

impl ModelResponse {
    pub fn new(model: ModelId, content: impl Into<String>) -> Self {
        Self {
            model,
            content: content.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: UsageRecord) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Result of querying several models at once.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub successful_responses: Vec<ModelResponse>,
    pub failed_models: Vec<ModelId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_record_total() {
        let usage = UsageRecord::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_cache_control_wire_value() {
        let json = serde_json::to_string(&CacheControl::Ephemeral).unwrap();
        assert_eq!(json, "\"ephemeral\"");
    }

    #[test]
    fn test_default_options_have_no_cache_directive() {
        assert!(QueryOptions::default().cache_control.is_none());
    }
}
