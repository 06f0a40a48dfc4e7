//! Bus topics and the events published on them.
//!
//! Each agent owns three topics:
//!
//! | Topic | Event |
//! |-------|-------|
//! | `agents:<id>:state` | [`BusEvent::StateUpdate`] |
//! | `agents:<id>:logs` | [`BusEvent::LogEntry`] |
//! | `agents:<id>:messages` | [`BusEvent::MessageEvent`] |

use crate::agent::state::{AgentState, AgentStatus, WaitTimer};
use crate::agent::value_objects::{AgentId, Sender};
use crate::context::tokens::{TokenUsage, context_usage_percentage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn state_topic(agent_id: &AgentId) -> String {
    format!("agents:{}:state", agent_id)
}

pub fn logs_topic(agent_id: &AgentId) -> String {
    format!("agents:{}:logs", agent_id)
}

pub fn messages_topic(agent_id: &AgentId) -> String {
    format!("agents:{}:messages", agent_id)
}

/// Severity of a mirrored log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Observable event published on the message bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    StateUpdate {
        agent_id: AgentId,
        status: AgentStatus,
        children: Vec<AgentId>,
        pending_actions: usize,
        wait_timer: Option<WaitTimer>,
        token_usage: TokenUsage,
        context_usage: f64,
    },
    LogEntry {
        agent_id: AgentId,
        level: LogLevel,
        message: String,
    },
    MessageEvent {
        agent_id: AgentId,
        from: Sender,
        content: Value,
    },
}

impl BusEvent {
    /// Snapshot the observable parts of `state`.
    pub fn state_update(state: &AgentState) -> Self {
        BusEvent::StateUpdate {
            agent_id: state.agent_id.clone(),
            status: state.status,
            children: state.children.iter().cloned().collect(),
            pending_actions: state.pending_actions.len(),
            wait_timer: state.wait_timer,
            token_usage: state.token_usage.clone(),
            context_usage: context_usage_percentage(state),
        }
    }

    pub fn log(agent_id: &AgentId, level: LogLevel, message: impl Into<String>) -> Self {
        BusEvent::LogEntry {
            agent_id: agent_id.clone(),
            level,
            message: message.into(),
        }
    }

    pub fn message(agent_id: &AgentId, from: Sender, content: Value) -> Self {
        BusEvent::MessageEvent {
            agent_id: agent_id.clone(),
            from,
            content,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        match self {
            BusEvent::StateUpdate { agent_id, .. }
            | BusEvent::LogEntry { agent_id, .. }
            | BusEvent::MessageEvent { agent_id, .. } => agent_id,
        }
    }
}
