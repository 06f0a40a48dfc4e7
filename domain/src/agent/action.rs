//! Decisions and actions.
//!
//! A [`Decision`] is what the models agree on: an action tag plus free-form
//! JSON params, exactly as it appears on the wire (`{"action": ..., "params": ...}`).
//! [`Decision::to_action`] turns it into the closed [`Action`] union the actor
//! dispatches on.

use crate::agent::value_objects::{AgentId, PARENT_SENDER};
use crate::core::error::DomainError;
use crate::core::model::ModelId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Tag of an action, as chosen by the models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Pause until a message arrives or the timeout elapses
    Wait,
    /// Start a child agent
    #[serde(alias = "spawn_child")]
    Spawn,
    /// Send a message to the parent, a child or a sibling
    #[serde(alias = "send_message")]
    Send,
    /// Run an external action through the action executor
    Execute,
    /// Finish the task and stop
    #[serde(alias = "finish")]
    Done,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Wait => "wait",
            ActionKind::Spawn => "spawn",
            ActionKind::Send => "send",
            ActionKind::Execute => "execute",
            ActionKind::Done => "done",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured decision produced by consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: ActionKind,
    #[serde(default)]
    pub params: Value,
}

impl Decision {
    pub fn new(action: ActionKind, params: Value) -> Self {
        Self { action, params }
    }

    /// Convert the wire form into a typed [`Action`].
    pub fn to_action(&self) -> Result<Action, DomainError> {
        let params = &self.params;
        match self.action {
            ActionKind::Wait => {
                let timeout = match params.get("timeout_ms") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(Duration::from_millis(v.as_u64().ok_or_else(|| {
                        DomainError::InvalidDecision(
                            "wait.timeout_ms must be a non-negative integer".to_string(),
                        )
                    })?)),
                };
                Ok(Action::Wait { timeout })
            }
            ActionKind::Spawn => {
                let spec: SpawnSpec = serde_json::from_value(params.clone())
                    .map_err(|e| DomainError::InvalidDecision(format!("spawn: {}", e)))?;
                if spec.task.trim().is_empty() {
                    return Err(DomainError::InvalidDecision(
                        "spawn.task must not be empty".to_string(),
                    ));
                }
                Ok(Action::Spawn(spec))
            }
            ActionKind::Send => {
                let to = params.get("to").and_then(Value::as_str).ok_or_else(|| {
                    DomainError::InvalidDecision("send.to is required".to_string())
                })?;
                let content = params.get("content").cloned().unwrap_or(Value::Null);
                Ok(Action::Send {
                    to: MessageTarget::from(to),
                    content,
                })
            }
            ActionKind::Execute => {
                let name = params.get("name").and_then(Value::as_str).ok_or_else(|| {
                    DomainError::InvalidDecision("execute.name is required".to_string())
                })?;
                Ok(Action::Execute {
                    name: name.to_string(),
                    args: params.get("args").cloned().unwrap_or(Value::Null),
                })
            }
            ActionKind::Done => Ok(Action::Done {
                result: params.get("result").cloned().unwrap_or(Value::Null),
            }),
        }
    }
}

/// Request to start a child agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSpec {
    /// Task text handed to the child as its prompt
    pub task: String,
    /// Explicit child id (generated when absent)
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    /// Models for the child (inherited from the parent when absent)
    #[serde(default)]
    pub models: Option<Vec<ModelId>>,
}

/// Recipient of a `send` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    Parent,
    Agent(AgentId),
}

impl From<&str> for MessageTarget {
    fn from(s: &str) -> Self {
        if s == PARENT_SENDER {
            MessageTarget::Parent
        } else {
            MessageTarget::Agent(AgentId::new(s))
        }
    }
}

impl std::fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageTarget::Parent => write!(f, "{}", PARENT_SENDER),
            MessageTarget::Agent(id) => write!(f, "{}", id),
        }
    }
}

/// Closed set of actions an agent can execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Wait { timeout: Option<Duration> },
    Spawn(SpawnSpec),
    Send { to: MessageTarget, content: Value },
    Execute { name: String, args: Value },
    Done { result: Value },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Wait { .. } => ActionKind::Wait,
            Action::Spawn(_) => ActionKind::Spawn,
            Action::Send { .. } => ActionKind::Send,
            Action::Execute { .. } => ActionKind::Execute,
            Action::Done { .. } => ActionKind::Done,
        }
    }
}
