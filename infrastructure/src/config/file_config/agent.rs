//! Agent configuration from TOML (`[agent]` section)

use serde::{Deserialize, Serialize};

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// models = ["claude-sonnet-4.5", "gpt-5.2-codex", "gemini-3-pro"]
/// context_limit = 128000
/// round_retries = 2
/// skip_initial_consensus = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    /// Models queried in every consensus round
    pub models: Vec<String>,
    /// Token budget per model history
    pub context_limit: Option<usize>,
    /// Consensus rounds retried before escalating to the parent
    pub round_retries: Option<u32>,
    /// Start agents idle instead of deciding immediately
    pub skip_initial_consensus: bool,
    /// Tag model queries as test traffic
    pub test_mode: Option<bool>,
    /// Replaces the built-in decision prompt
    pub system_prompt: Option<String>,
}
