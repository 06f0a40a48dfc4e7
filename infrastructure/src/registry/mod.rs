//! In-memory agent registry.

use quorum_application::ports::agent_registry::{AgentRegistry, RegistryError};
use quorum_application::AgentHandle;
use quorum_domain::AgentId;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Process-wide lookup table from agent id to live handle.
///
/// Ids are unique while registered; agents unregister themselves on stop.
#[derive(Default)]
pub struct InMemoryRegistry {
    agents: RwLock<HashMap<AgentId, AgentHandle>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.read().map(|agents| agents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every registered agent, sorted.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self
            .agents
            .read()
            .map(|agents| agents.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}

impl AgentRegistry for InMemoryRegistry {
    fn register(&self, id: AgentId, handle: AgentHandle) -> Result<(), RegistryError> {
        let mut agents = self
            .agents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // A closed handle is a leftover from an agent that died mid-shutdown.
        if agents.get(&id).is_some_and(|existing| !existing.is_closed()) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        debug!(agent_id = %id, "Registered agent");
        agents.insert(id, handle);
        Ok(())
    }

    fn unregister(&self, id: &AgentId) {
        let mut agents = self
            .agents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if agents.remove(id).is_some() {
            debug!(agent_id = %id, "Unregistered agent");
        }
    }

    fn lookup(&self, id: &AgentId) -> Option<AgentHandle> {
        self.agents
            .read()
            .ok()
            .and_then(|agents| agents.get(id).cloned())
            .filter(|handle| !handle.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Script, ScriptedModelGateway};
    use quorum_application::{AgentConfig, Injected, Supervisor};
    use std::sync::Arc;

    async fn start(supervisor: &Supervisor, id: &str) -> AgentHandle {
        let injected = Injected::new().with_gateway(Arc::new(ScriptedModelGateway::new(
            Script::default(),
        )));
        supervisor
            .start_agent(
                AgentConfig::new()
                    .with_agent_id(id)
                    .with_models(["m"])
                    .skip_initial_consensus(),
                &injected,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_lookup_unregister() {
        let supervisor = Supervisor::new();
        let registry = InMemoryRegistry::new();
        let handle = start(&supervisor, "a").await;
        let id = AgentId::new("a");

        registry.register(id.clone(), handle.clone()).unwrap();
        assert_eq!(registry.lookup(&id).unwrap().id(), &id);
        assert_eq!(registry.agent_ids(), vec![id.clone()]);

        assert!(matches!(
            registry.register(id.clone(), handle),
            Err(RegistryError::AlreadyRegistered(_))
        ));

        registry.unregister(&id);
        assert!(registry.lookup(&id).is_none());
        assert!(registry.is_empty());

        supervisor.shutdown();
        supervisor.join().await;
    }

    #[tokio::test]
    async fn test_closed_handles_are_replaced() {
        let supervisor = Supervisor::new();
        let registry = InMemoryRegistry::new();
        let id = AgentId::new("a");

        let stale = start(&supervisor, "a").await;
        registry.register(id.clone(), stale.clone()).unwrap();
        stale.stop().unwrap();
        stale.closed().await;
        assert!(registry.lookup(&id).is_none());

        let fresh = start(&supervisor, "a").await;
        registry.register(id.clone(), fresh).unwrap();
        assert!(registry.lookup(&id).is_some());
        assert_eq!(registry.len(), 1);

        supervisor.shutdown();
        supervisor.join().await;
    }
}
