//! Quorum configuration from TOML (`[quorum]` section)
//!
//! ```toml
//! [quorum]
//! rule = "majority"            # or "unanimous", "at_least:2", "75%"
//! tie_break = "first_responder" # or "model_order"
//! ```

use super::ConfigValidationError;
use quorum_domain::{QuorumPolicy, QuorumRule, TieBreak};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQuorumConfig {
    /// Consensus rule: "majority", "unanimous", "at_least:N", "N%"
    pub rule: String,
    /// Tie-break between equally large groups
    pub tie_break: String,
}

impl Default for FileQuorumConfig {
    fn default() -> Self {
        Self {
            rule: QuorumRule::default().as_config_str(),
            tie_break: TieBreak::default().to_string(),
        }
    }
}

impl FileQuorumConfig {
    pub fn parse_rule(&self) -> Result<QuorumRule, ConfigValidationError> {
        self.rule
            .parse()
            .map_err(|_| ConfigValidationError::InvalidQuorumRule(self.rule.clone()))
    }

    pub fn parse_tie_break(&self) -> Result<TieBreak, ConfigValidationError> {
        self.tie_break
            .parse()
            .map_err(|_| ConfigValidationError::InvalidTieBreak(self.tie_break.clone()))
    }

    /// Policy described by this section. Unparseable values fall back to
    /// their defaults; [`FileConfig::validate`](super::FileConfig::validate)
    /// reports them.
    pub fn to_policy(&self) -> QuorumPolicy {
        QuorumPolicy::new(
            self.parse_rule().unwrap_or_default(),
            self.parse_tie_break().unwrap_or_default(),
        )
    }
}
