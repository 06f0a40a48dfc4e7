//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into the application's
//! [`AgentConfig`] by [`FileConfig::to_agent_config`].

mod agent;
mod logging;
mod quorum;
mod retry;

pub use agent::FileAgentConfig;
pub use logging::FileLoggingConfig;
pub use quorum::FileQuorumConfig;
pub use retry::FileRetryConfig;

use quorum_application::AgentConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("model name cannot be empty")]
    EmptyModelName,

    #[error("model listed twice: {0}")]
    DuplicateModel(String),

    #[error("agent.context_limit cannot be 0")]
    InvalidContextLimit,

    #[error("retry.max_attempts cannot be 0")]
    InvalidRetryAttempts,

    #[error("quorum.rule: unknown value '{0}'")]
    InvalidQuorumRule(String),

    #[error("quorum.tie_break: unknown value '{0}'")]
    InvalidTieBreak(String),

    #[error("quorum.rule '{rule}' can never be met with {models} models")]
    UnsatisfiableRule { rule: String, models: usize },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub agent: FileAgentConfig,
    pub quorum: FileQuorumConfig,
    pub retry: FileRetryConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning every detected problem.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for model in &self.agent.models {
            if model.trim().is_empty() {
                errors.push(ConfigValidationError::EmptyModelName);
            } else if !seen.insert(model.as_str()) {
                errors.push(ConfigValidationError::DuplicateModel(model.clone()));
            }
        }

        if self.agent.context_limit == Some(0) {
            errors.push(ConfigValidationError::InvalidContextLimit);
        }
        if self.retry.max_attempts == 0 {
            errors.push(ConfigValidationError::InvalidRetryAttempts);
        }

        match self.quorum.parse_rule() {
            Ok(rule) => {
                let models = self.agent.models.len();
                // Without configured models the rule is checked once models are known.
                let total = if models == 0 { usize::MAX } else { models };
                if rule.check_satisfiable(total).is_err() {
                    errors.push(ConfigValidationError::UnsatisfiableRule {
                        rule: self.quorum.rule.clone(),
                        models,
                    });
                }
            }
            Err(e) => errors.push(e),
        }
        if let Err(e) = self.quorum.parse_tie_break() {
            errors.push(e);
        }

        errors
    }

    /// Base configuration for a root agent. Unset fields keep the
    /// application defaults.
    pub fn to_agent_config(&self) -> AgentConfig {
        let agent = &self.agent;
        let mut config = AgentConfig::new()
            .with_quorum(self.quorum.to_policy())
            .with_retry(self.retry.to_policy());

        if !agent.models.is_empty() {
            config = config.with_models(agent.models.iter().map(String::as_str));
        }
        if let Some(limit) = agent.context_limit {
            config = config.with_context_limit(limit);
        }
        if let Some(retries) = agent.round_retries {
            config = config.with_round_retries(retries);
        }
        if agent.skip_initial_consensus {
            config = config.skip_initial_consensus();
        }
        if let Some(test_mode) = agent.test_mode {
            config = config.with_test_mode(test_mode);
        }
        if let Some(prompt) = &agent.system_prompt {
            config = config.with_system_prompt(prompt.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_domain::{ModelId, QuorumRule, TieBreak};
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[agent]
models = ["a", "b", "c"]
context_limit = 8000
round_retries = 1

[quorum]
rule = "unanimous"
tie_break = "model_order"

[retry]
max_attempts = 2
base_delay_ms = 50

[logging]
conversation_log = "run.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_empty());
        assert_eq!(config.retry.max_delay_ms, 5000);

        let agent = config.to_agent_config();
        assert_eq!(
            agent.models,
            Some(vec![ModelId::new("a"), ModelId::new("b"), ModelId::new("c")])
        );
        assert_eq!(agent.context_limit, Some(8000));
        assert_eq!(agent.effective_round_retries(), 1);
        assert_eq!(agent.effective_quorum().rule, QuorumRule::Unanimous);
        assert_eq!(agent.effective_quorum().tie_break, TieBreak::ModelOrder);
        assert_eq!(agent.effective_retry().base_delay, Duration::from_millis(50));
        assert!(!agent.skip_initial_consensus);
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        let agent = config.to_agent_config();
        assert!(agent.models.is_none());
        assert!(agent.context_limit.is_none());
        assert!(agent.system_prompt.is_none());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let toml_str = r#"
[agent]
models = ["a", "", "a"]
context_limit = 0

[quorum]
rule = "most"
tie_break = "coin"

[retry]
max_attempts = 0
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let errors = config.validate();
        assert!(errors.contains(&ConfigValidationError::EmptyModelName));
        assert!(errors.contains(&ConfigValidationError::DuplicateModel("a".to_string())));
        assert!(errors.contains(&ConfigValidationError::InvalidContextLimit));
        assert!(errors.contains(&ConfigValidationError::InvalidRetryAttempts));
        assert!(errors.contains(&ConfigValidationError::InvalidQuorumRule("most".to_string())));
        assert!(errors.contains(&ConfigValidationError::InvalidTieBreak("coin".to_string())));
    }

    #[test]
    fn test_validate_unsatisfiable_rule() {
        let toml_str = r#"
[agent]
models = ["a", "b"]

[quorum]
rule = "at_least:3"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.validate(),
            vec![ConfigValidationError::UnsatisfiableRule {
                rule: "at_least:3".to_string(),
                models: 2
            }]
        );
    }
}
