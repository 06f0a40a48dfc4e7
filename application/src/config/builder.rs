//! Config builder: add-if-absent merging and validation.
//!
//! Merging never overwrites a value the caller set explicitly. Injected
//! handles and parent defaults only fill gaps.

use super::agent_config::{AgentConfig, Injected};
use quorum_domain::PARENT_SENDER;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

pub struct ConfigBuilder;

impl ConfigBuilder {
    /// Merge `injected` handles into `base`. Fields already in `base` win.
    pub fn build(base: AgentConfig, injected: &Injected) -> AgentConfig {
        Self::inject(base, injected)
    }

    /// Same merge as [`build`](Self::build). Applying it twice is a no-op.
    pub fn inject(mut config: AgentConfig, injected: &Injected) -> AgentConfig {
        config.handles.fill_from(injected);
        config
    }

    /// Derive a child's config from its parent's.
    ///
    /// The parent's handles and runtime settings become defaults for the
    /// child; the child's `parent` is always the parent agent's id.
    pub fn propagate_to_children(parent: &AgentConfig, mut child: AgentConfig) -> AgentConfig {
        child.handles.fill_from(&parent.handles);
        if parent.agent_id.is_some() {
            child.parent = parent.agent_id.clone();
        }
        if child.models.is_none() {
            child.models = parent.models.clone();
        }
        if child.context_limit.is_none() {
            child.context_limit = parent.context_limit;
        }
        if child.quorum.is_none() {
            child.quorum = parent.quorum;
        }
        if child.retry.is_none() {
            child.retry = parent.retry;
        }
        if child.round_retries.is_none() {
            child.round_retries = parent.round_retries;
        }
        if child.test_mode.is_none() {
            child.test_mode = parent.test_mode;
        }
        child
    }

    /// Check every present field. Absent optional fields pass.
    pub fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
        if let Some(id) = &config.agent_id
            && id.as_str().trim().is_empty()
        {
            return Err(ConfigError::invalid("agent_id", "must not be empty"));
        }
        if let Some(id) = &config.agent_id
            && id.as_str() == PARENT_SENDER
        {
            return Err(ConfigError::invalid(
                "agent_id",
                format!("'{}' is reserved for parent attribution", PARENT_SENDER),
            ));
        }
        if let Some(id) = &config.task_id
            && id.as_str().trim().is_empty()
        {
            return Err(ConfigError::invalid("task_id", "must not be empty"));
        }
        if config.context_limit == Some(0) {
            return Err(ConfigError::invalid("context_limit", "must be greater than 0"));
        }

        if let Some(models) = &config.models {
            let mut seen = HashSet::new();
            for model in models {
                if model.as_str().trim().is_empty() {
                    return Err(ConfigError::invalid("models", "model id must not be empty"));
                }
                if !seen.insert(model) {
                    return Err(ConfigError::invalid(
                        "models",
                        format!("duplicate model id '{}'", model),
                    ));
                }
            }
        }

        if let Some(retry) = &config.retry
            && retry.max_attempts == 0
        {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }

        if let Some(quorum) = &config.quorum {
            let total = match &config.models {
                Some(models) if !models.is_empty() => models.len(),
                _ => usize::MAX,
            };
            quorum
                .rule
                .check_satisfiable(total)
                .map_err(|reason| ConfigError::invalid("quorum.rule", reason))?;
        }

        Ok(())
    }
}
