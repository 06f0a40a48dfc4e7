//! Child Supervisor Facade
//!
//! A [`Supervisor`] is a supervision scope: every agent started through it
//! runs as a task tracked by the scope, and shutting the scope down stops
//! them all. The supervisor handle is also the spawn authority injected into
//! agents so they can start children in the same scope.

use crate::config::{AgentConfig, ConfigBuilder, ConfigError, Injected};
use crate::use_cases::actor::{AgentActor, AgentHandle};
use quorum_domain::AgentId;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("Supervision scope is closed")]
    ScopeClosed,

    #[error("Agent already exists: {0}")]
    DuplicateAgent(AgentId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Agent {0} failed to start")]
    StartupFailed(AgentId),
}

/// Supervision scope for a tree of agents.
#[derive(Clone, Default)]
pub struct Supervisor {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an agent in this scope.
    ///
    /// `injected` fills handles absent from `config`; explicit values are
    /// never overwritten. Nothing stays registered when startup fails.
    pub async fn start_agent(
        &self,
        config: AgentConfig,
        injected: &Injected,
    ) -> Result<AgentHandle, SpawnError> {
        if self.is_closed() {
            return Err(SpawnError::ScopeClosed);
        }
        let config = ConfigBuilder::build(config, injected);
        AgentActor::start(config, self).await
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token cancelled when the scope shuts down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of agent tasks still running.
    pub fn active_agents(&self) -> usize {
        self.tracker.len()
    }

    /// Run `task` in this scope. Returns `false` once the scope is closed.
    pub(crate) fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            return false;
        }
        self.tracker.spawn(task);
        true
    }

    /// Stop every agent in the scope at its next suspension point.
    pub fn shutdown(&self) {
        info!("Shutting down supervision scope ({} agents)", self.tracker.len());
        self.cancel.cancel();
        self.tracker.close();
    }

    /// Wait until every agent task of the scope has finished.
    pub async fn join(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("closed", &self.is_closed())
            .field("active_agents", &self.tracker.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::ports::agent_registry::AgentRegistry;
    use crate::ports::message_bus::MessageBus;
    use crate::use_cases::test_support::{ScriptedGateway, TestBus, TestRegistry};
    use quorum_domain::events::{messages_topic, state_topic};
    use quorum_domain::{BusEvent, Sender};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn injected(registry: Arc<TestRegistry>) -> Injected {
        Injected::new()
            .with_gateway(Arc::new(ScriptedGateway::new()))
            .with_registry(registry)
    }

    fn config(id: &str) -> AgentConfig {
        AgentConfig::new()
            .with_agent_id(id)
            .with_prompt("idle")
            .with_models(["m1"])
            .with_retry(RetryPolicy::immediate(1))
            .skip_initial_consensus()
    }

    #[tokio::test]
    async fn test_duplicate_agent_is_rejected() {
        let registry = Arc::new(TestRegistry::default());
        let supervisor = Supervisor::new();
        let injected = injected(registry);

        supervisor.start_agent(config("a"), &injected).await.unwrap();
        let err = supervisor.start_agent(config("a"), &injected).await.unwrap_err();
        assert!(matches!(err, SpawnError::DuplicateAgent(id) if id.as_str() == "a"));
        assert_eq!(supervisor.active_agents(), 1);

        supervisor.shutdown();
        supervisor.join().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_agents_and_closes_scope() {
        let registry = Arc::new(TestRegistry::default());
        let supervisor = Supervisor::new();
        let injected = injected(registry.clone());

        let a = supervisor.start_agent(config("a"), &injected).await.unwrap();
        let b = supervisor.start_agent(config("b"), &injected).await.unwrap();

        supervisor.shutdown();
        tokio::time::timeout(Duration::from_secs(2), supervisor.join())
            .await
            .expect("scope should drain");

        assert!(a.is_closed());
        assert!(b.is_closed());
        assert!(registry.lookup(&AgentId::new("a")).is_none());
        assert!(matches!(
            supervisor.start_agent(config("c"), &injected).await,
            Err(SpawnError::ScopeClosed)
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_does_not_register() {
        let registry = Arc::new(TestRegistry::default());
        let supervisor = Supervisor::new();

        let err = supervisor
            .start_agent(config("bad").with_context_limit(0), &injected(registry.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, SpawnError::InvalidConfig(_)));
        assert!(registry.lookup(&AgentId::new("bad")).is_none());
        assert_eq!(supervisor.active_agents(), 0);
    }

    #[tokio::test]
    async fn test_explicit_handles_win_over_injected() {
        let bus = Arc::new(TestBus::default());
        let other_bus = Arc::new(TestBus::default());
        let mut own = bus.subscribe(&state_topic(&AgentId::new("a")));
        let mut other = other_bus.subscribe(&state_topic(&AgentId::new("a")));
        let supervisor = Supervisor::new();

        let config = config("a").with_handles(Injected::new().with_pubsub(bus.clone()));
        let injected = Injected::new()
            .with_gateway(Arc::new(ScriptedGateway::new()))
            .with_pubsub(other_bus.clone());
        supervisor.start_agent(config, &injected).await.unwrap();

        assert!(own.recv().await.is_ok());
        assert!(other.try_recv().is_err());

        supervisor.shutdown();
        supervisor.join().await;
    }

    #[tokio::test]
    async fn test_concurrent_scopes_are_isolated() {
        let id = AgentId::new("same");
        let bus_a = Arc::new(TestBus::default());
        let bus_b = Arc::new(TestBus::default());
        let mut messages_a = bus_a.subscribe(&messages_topic(&id));
        let mut messages_b = bus_b.subscribe(&messages_topic(&id));
        let scope_a = Supervisor::new();
        let scope_b = Supervisor::new();

        let injected_a = Injected::new()
            .with_gateway(Arc::new(ScriptedGateway::new()))
            .with_pubsub(bus_a);
        let injected_b = Injected::new()
            .with_gateway(Arc::new(ScriptedGateway::new()))
            .with_pubsub(bus_b);

        let a = scope_a.start_agent(config("same"), &injected_a).await.unwrap();
        let b = scope_b.start_agent(config("same"), &injected_b).await.unwrap();
        a.send_message(Sender::Parent, json!({"bus": "a"})).unwrap();
        b.send_message(Sender::Parent, json!({"bus": "b"})).unwrap();

        for (rx, expected) in [(&mut messages_a, "a"), (&mut messages_b, "b")] {
            let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("own message should arrive")
                .unwrap();
            match event {
                BusEvent::MessageEvent { content, .. } => assert_eq!(content["bus"], expected),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(messages_a.try_recv().is_err());
        assert!(messages_b.try_recv().is_err());

        scope_a.shutdown();
        scope_a.join().await;
        assert!(a.is_closed());
        assert!(!b.is_closed());

        scope_b.shutdown();
        scope_b.join().await;
    }
}
