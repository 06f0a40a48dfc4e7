//! Agent configuration.
//!
//! [`AgentConfig`] is what a caller hands to the supervisor to start an
//! agent. Every caller field is optional; the [`ConfigBuilder`] merges in
//! injected handles and parent defaults, and the actor applies the remaining
//! defaults when it starts.
//!
//! [`ConfigBuilder`]: super::builder::ConfigBuilder

use super::retry_policy::RetryPolicy;
use crate::ports::action_executor::ActionExecutor;
use crate::ports::agent_registry::AgentRegistry;
use crate::ports::conversation_logger::ConversationLogger;
use crate::ports::message_bus::MessageBus;
use crate::ports::model_gateway::ModelGateway;
use crate::use_cases::actor::WeakAgentHandle;
use crate::use_cases::supervisor::Supervisor;
use quorum_domain::{AgentId, AgentProfile, ModelId, QuorumPolicy, TaskId};
use std::sync::Arc;

/// Consensus rounds re-run after a failed round before escalating.
pub const DEFAULT_ROUND_RETRIES: u32 = 2;

/// Infrastructure handles injected into an agent.
///
/// Handles are shared by reference and never mutated after the agent starts.
#[derive(Clone, Default)]
pub struct Injected {
    pub pubsub: Option<Arc<dyn MessageBus>>,
    pub registry: Option<Arc<dyn AgentRegistry>>,
    pub supervisor: Option<Supervisor>,
    pub gateway: Option<Arc<dyn ModelGateway>>,
    pub executor: Option<Arc<dyn ActionExecutor>>,
    pub logger: Option<Arc<dyn ConversationLogger>>,
}

impl Injected {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pubsub(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.pubsub = Some(bus);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn AgentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_supervisor(mut self, supervisor: Supervisor) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Fill every absent handle from `other`. Present handles are kept.
    pub fn fill_from(&mut self, other: &Injected) {
        if self.pubsub.is_none() {
            self.pubsub = other.pubsub.clone();
        }
        if self.registry.is_none() {
            self.registry = other.registry.clone();
        }
        if self.supervisor.is_none() {
            self.supervisor = other.supervisor.clone();
        }
        if self.gateway.is_none() {
            self.gateway = other.gateway.clone();
        }
        if self.executor.is_none() {
            self.executor = other.executor.clone();
        }
        if self.logger.is_none() {
            self.logger = other.logger.clone();
        }
    }
}

impl std::fmt::Debug for Injected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injected")
            .field("pubsub", &self.pubsub.is_some())
            .field("registry", &self.registry.is_some())
            .field("supervisor", &self.supervisor.is_some())
            .field("gateway", &self.gateway.is_some())
            .field("executor", &self.executor.is_some())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Configuration of a single agent.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    pub agent_id: Option<AgentId>,
    pub task_id: Option<TaskId>,
    pub parent: Option<AgentId>,
    /// Mailbox of the parent, held weakly
    pub parent_address: Option<WeakAgentHandle>,
    /// Initiating task text, recorded as the first history entry
    pub prompt: Option<String>,
    pub models: Option<Vec<ModelId>>,
    pub context_limit: Option<usize>,
    pub quorum: Option<QuorumPolicy>,
    pub retry: Option<RetryPolicy>,
    pub round_retries: Option<u32>,
    pub skip_initial_consensus: bool,
    pub test_mode: Option<bool>,
    pub summary: Option<String>,
    pub system_prompt: Option<String>,
    pub profile: Option<AgentProfile>,
    pub handles: Injected,
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Builder Methods ====================

    pub fn with_agent_id(mut self, id: impl Into<AgentId>) -> Self {
        self.agent_id = Some(id.into());
        self
    }

    pub fn with_task_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    pub fn with_parent(mut self, parent: AgentId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_parent_address(mut self, address: WeakAgentHandle) -> Self {
        self.parent_address = Some(address);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_models<I, M>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModelId>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = Some(limit);
        self
    }

    pub fn with_quorum(mut self, policy: QuorumPolicy) -> Self {
        self.quorum = Some(policy);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_round_retries(mut self, retries: u32) -> Self {
        self.round_retries = Some(retries);
        self
    }

    pub fn skip_initial_consensus(mut self) -> Self {
        self.skip_initial_consensus = true;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = Some(test_mode);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_profile(mut self, profile: AgentProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_handles(mut self, handles: Injected) -> Self {
        self.handles = handles;
        self
    }

    // ==================== Effective Values ====================

    pub fn effective_quorum(&self) -> QuorumPolicy {
        self.quorum.unwrap_or_default()
    }

    pub fn effective_retry(&self) -> RetryPolicy {
        self.retry.unwrap_or_default()
    }

    pub fn effective_round_retries(&self) -> u32 {
        self.round_retries.unwrap_or(DEFAULT_ROUND_RETRIES)
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode.unwrap_or(false)
    }
}
