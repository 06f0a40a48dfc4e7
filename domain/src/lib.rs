//! Domain layer for quorum-tree
//!
//! This crate contains the core types and pure logic of the agent tree.
//! It has no dependencies on infrastructure or an async runtime.
//!
//! # Core Concepts
//!
//! ## Agent
//!
//! An agent owns an [`AgentState`]: one history per backend model, pending
//! actions, an optional wait timer and its children. Only the actor running
//! the agent mutates it.
//!
//! ## Quorum
//!
//! Every step, all of the agent's models are asked for the next
//! [`Decision`]. Identical decisions are grouped and the largest group wins
//! when it satisfies the [`QuorumRule`].
//!
//! ## Context
//!
//! Each model sees its own history rendered as role-tagged [`Message`]s,
//! with token usage tracked against a per-model context limit.

pub mod agent;
pub mod context;
pub mod core;
pub mod events;
pub mod history;
pub mod quorum;
pub mod session;

// Re-export commonly used types
pub use agent::{
    action::{Action, ActionKind, Decision, MessageTarget, SpawnSpec},
    state::{AgentState, AgentStatus, DEFAULT_CONTEXT_LIMIT, PendingAction, WaitKind, WaitTimer},
    value_objects::{ActionId, AgentId, PARENT_SENDER, Sender, TaskId, TimerToken},
};
pub use context::{AgentProfile, FieldPrompts, TokenUsage};
pub use core::{error::DomainError, model::ModelId};
pub use events::{BusEvent, LogLevel};
pub use history::{EntryKind, HistoryEntry};
pub use session::{
    entities::{Message, Role},
    response::{CacheControl, ModelResponse, QueryOptions, QueryOutcome, UsageRecord},
};

// Re-export quorum types
pub use quorum::{
    Agreement, ConsensusOutcome, ConsensusRound, ModelDecision, QuorumPolicy, QuorumRule,
    TieBreak, parse_decision,
};
