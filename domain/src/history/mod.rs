//! Per-model conversation history.
//!
//! An agent keeps one append-only `Vec<HistoryEntry>` per model. Entries are
//! immutable once recorded; ordering within one history is the only ordering
//! guarantee.

use crate::agent::action::Decision;
use crate::agent::value_objects::{ActionId, Sender, TimerToken};
use crate::core::clock::now_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record in a model's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    #[serde(flatten)]
    pub kind: EntryKind,
}

/// Variant payload of a [`HistoryEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// Free text from the initiating task
    Prompt { text: String },
    /// Action chosen by consensus
    Decision { decision: Decision },
    /// Inbound message. `from` is `None` only for unattributed payloads.
    Event {
        from: Option<Sender>,
        content: Value,
    },
    /// Outcome of a previously dispatched action
    Result { action_id: ActionId, result: Value },
    /// The agent's wait timer fired
    WaitTimeout { token: TimerToken },
}

impl HistoryEntry {
    pub fn new(kind: EntryKind) -> Self {
        Self {
            timestamp: now_millis(),
            kind,
        }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(EntryKind::Prompt { text: text.into() })
    }

    pub fn decision(decision: Decision) -> Self {
        Self::new(EntryKind::Decision { decision })
    }

    /// Attributed inbound message.
    pub fn event(from: Sender, content: Value) -> Self {
        Self::new(EntryKind::Event {
            from: Some(from),
            content,
        })
    }

    /// Inbound payload with no known sender.
    pub fn unattributed(content: Value) -> Self {
        Self::new(EntryKind::Event {
            from: None,
            content,
        })
    }

    pub fn result(action_id: ActionId, result: Value) -> Self {
        Self::new(EntryKind::Result { action_id, result })
    }

    pub fn wait_timeout(token: TimerToken) -> Self {
        Self::new(EntryKind::WaitTimeout { token })
    }

    /// Stable tag of this entry's variant.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            EntryKind::Prompt { .. } => "prompt",
            EntryKind::Decision { .. } => "decision",
            EntryKind::Event { .. } => "event",
            EntryKind::Result { .. } => "result",
            EntryKind::WaitTimeout { .. } => "wait_timeout",
        }
    }
}
