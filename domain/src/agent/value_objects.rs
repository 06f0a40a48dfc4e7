//! Agent value objects - identifiers and message attribution.
//!
//! # Identifiers
//! - [`AgentId`] - Unique identifier for an agent in the tree
//! - [`TaskId`] - Identifier of the task an agent was created for
//! - [`ActionId`] - Correlation id of a dispatched action
//! - [`TimerToken`] - Identity of one armed wait timer
//!
//! # Attribution
//! - [`Sender`] - Origin of an inbound agent message (parent or another agent)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};

/// Literal used for messages coming from an agent's parent.
pub const PARENT_SENDER: &str = "parent";

/// Unique identifier for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates an AgentId from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new unique AgentId.
    pub fn generate() -> Self {
        Self(generate_id("agent"))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for AgentId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the task an agent works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(generate_id("task"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for TaskId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation id linking a dispatched action to its result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an armed wait timer.
///
/// Tokens are minted from a per-agent sequence, so a token is never reused
/// within one agent's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TimerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Origin of an inbound agent message.
///
/// Serialized as the literal `"parent"` for the parent, or as the raw agent
/// id for any other agent (child or sibling).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    Parent,
    Agent(AgentId),
}

impl Sender {
    pub fn as_str(&self) -> &str {
        match self {
            Sender::Parent => PARENT_SENDER,
            Sender::Agent(id) => id.as_str(),
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Sender::Parent)
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Sender {
    fn from(s: &str) -> Self {
        if s == PARENT_SENDER {
            Sender::Parent
        } else {
            Sender::Agent(AgentId::new(s))
        }
    }
}

impl Serialize for Sender {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sender {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Sender::from(s.as_str()))
    }
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Time-based id with a process-wide counter so ids minted in the same
/// nanosecond still differ.
fn generate_id(prefix: &str) -> String {
    let nanos = crate::core::clock::now_nanos();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{:x}-{:04x}", prefix, nanos & 0xffff_ffff_ffff, seq & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = AgentId::generate();
        let b = AgentId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("agent-"));
        assert!(TaskId::generate().as_str().starts_with("task-"));
    }

    #[test]
    fn test_sender_serialization() {
        assert_eq!(serde_json::to_string(&Sender::Parent).unwrap(), "\"parent\"");
        assert_eq!(
            serde_json::to_string(&Sender::Agent(AgentId::new("child-1"))).unwrap(),
            "\"child-1\""
        );
    }

    #[test]
    fn test_sender_from_str() {
        assert_eq!(Sender::from("parent"), Sender::Parent);
        assert_eq!(
            Sender::from("sibling-7"),
            Sender::Agent(AgentId::new("sibling-7"))
        );
        let parsed: Sender = serde_json::from_str("\"parent\"").unwrap();
        assert!(parsed.is_parent());
    }

    #[test]
    fn test_timer_token_display() {
        assert_eq!(TimerToken::new(3).to_string(), "timer-3");
        assert!(TimerToken::new(1) < TimerToken::new(2));
    }
}
