//! Agent registry port
//!
//! Unique-key registration of running agents so siblings can address each
//! other by id.

use crate::use_cases::actor::AgentHandle;
use quorum_domain::AgentId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Agent already registered: {0}")]
    AlreadyRegistered(AgentId),
}

/// Port for registering and resolving agents.
pub trait AgentRegistry: Send + Sync {
    /// Register `handle` under `id`. Fails if `id` is taken.
    fn register(&self, id: AgentId, handle: AgentHandle) -> Result<(), RegistryError>;

    /// Remove `id`. No-op if absent.
    fn unregister(&self, id: &AgentId);

    /// Resolve a live agent by id.
    fn lookup(&self, id: &AgentId) -> Option<AgentHandle>;
}
