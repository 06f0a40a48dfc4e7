//! Agent domain module
//!
//! - [`value_objects`] — identifiers and sender attribution
//! - [`state`] — the per-agent state owned by one actor
//! - [`action`] — consensus decisions and the closed action union

pub mod action;
pub mod state;
pub mod value_objects;

pub use action::{Action, ActionKind, Decision, MessageTarget, SpawnSpec};
pub use state::{AgentState, AgentStatus, PendingAction, WaitKind, WaitTimer};
pub use value_objects::{ActionId, AgentId, PARENT_SENDER, Sender, TaskId, TimerToken};
