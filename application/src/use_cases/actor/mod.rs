//! Agent Actor
//!
//! One tokio task per agent, one unbounded mailbox, stimuli processed
//! strictly one at a time. The actor is the only owner of its
//! [`AgentState`], so the state needs no locks.
//!
//! ```text
//! mailbox ──▶ MessageRouter ──▶ (cancel timer, schedule continuation)
//!                                       │
//!   ContinueConsensus ◀─────────────────┘
//!         │
//!         ▼
//!   ConsensusEngine ──▶ ActorRuntime::execute_action ──▶ wait | spawn | send | execute | done
//! ```

mod dispatch;
mod handle;

pub use handle::{AgentHandle, ExitReason, Stimulus, WeakAgentHandle};

use crate::config::{AgentConfig, ConfigBuilder, ConfigError};
use crate::ports::action_executor::NoActionExecutor;
use crate::ports::conversation_logger::{ConversationEvent, NoConversationLogger};
use crate::ports::message_bus::NoBus;
use crate::use_cases::consensus::{ConsensusEngine, ConsensusError};
use crate::use_cases::router::{Inbound, MessageRouter};
use crate::use_cases::supervisor::{SpawnError, Supervisor};
use dispatch::ActorRuntime;
use quorum_domain::context::{
    CONTEXT_WARNING_THRESHOLD_PCT, context_usage_percentage, estimate_total_context_tokens,
    inject_operating_profile, is_near_context_limit,
};
use quorum_domain::context::prompt::DECISION_SYSTEM_PROMPT;
use quorum_domain::events::{logs_topic, messages_topic, state_topic};
use quorum_domain::{
    AgentId, AgentState, AgentStatus, BusEvent, DEFAULT_CONTEXT_LIMIT, HistoryEntry, LogLevel,
    ModelId, Sender, TaskId, TimerToken,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors that stop an agent
#[derive(Error, Debug)]
pub enum ActorError {
    #[error("Mailbox of agent {0} is closed")]
    MailboxClosed(AgentId),

    #[error("Spawn failed: {0}")]
    Spawn(#[from] SpawnError),
}

/// Mark a continuation as scheduled and send the signal to `mailbox`.
///
/// Every call sends one signal; no other state field is touched.
pub fn schedule_consensus_continuation(
    state: &mut AgentState,
    mailbox: &mpsc::UnboundedSender<Stimulus>,
) {
    state.consensus_scheduled = true;
    if mailbox.send(Stimulus::ContinueConsensus).is_err() {
        debug!(agent_id = %state.agent_id, "Continuation dropped: mailbox closed");
    }
}

pub struct AgentActor {
    state: AgentState,
    engine: ConsensusEngine,
    runtime: ActorRuntime,
    inbox: mpsc::UnboundedReceiver<Stimulus>,
    round_retries: u32,
    skip_initial_consensus: bool,
    context_warned: bool,
    cancel: CancellationToken,
}

impl AgentActor {
    /// Validate `config`, build the initial state and run the agent under
    /// `supervisor`. Resolves once the agent's task has started.
    pub async fn start(config: AgentConfig, supervisor: &Supervisor) -> Result<AgentHandle, SpawnError> {
        if supervisor.is_closed() {
            return Err(SpawnError::ScopeClosed);
        }
        ConfigBuilder::validate(&config)?;

        let mut config = config;
        let models = config
            .models
            .clone()
            .filter(|models| !models.is_empty())
            .ok_or(ConfigError::MissingField("models"))?;
        let gateway = config
            .handles
            .gateway
            .clone()
            .ok_or(ConfigError::MissingField("gateway"))?;
        let agent_id = config.agent_id.get_or_insert_with(AgentId::generate).clone();
        let task_id = config.task_id.get_or_insert_with(TaskId::generate).clone();
        // Children start under the injected spawn authority, else this scope.
        let spawn_authority = config
            .handles
            .supervisor
            .get_or_insert_with(|| supervisor.clone())
            .clone();

        let state = Self::initial_state(&config, agent_id.clone(), task_id, models);

        let (tx, inbox) = mpsc::unbounded_channel();
        let handle = AgentHandle::new(agent_id.clone(), tx);

        let registry = config.handles.registry.clone();
        if let Some(registry) = &registry {
            registry
                .register(agent_id.clone(), handle.clone())
                .map_err(|_| SpawnError::DuplicateAgent(agent_id.clone()))?;
        }

        let logger = config
            .handles
            .logger
            .clone()
            .unwrap_or_else(|| Arc::new(NoConversationLogger));
        let engine = ConsensusEngine::new(gateway, config.effective_quorum(), config.effective_retry())
            .with_logger(logger.clone())
            .with_test_mode(config.is_test_mode());
        let round_retries = config.effective_round_retries();
        let skip_initial_consensus = config.skip_initial_consensus;
        let runtime = ActorRuntime::new(
            config.clone(),
            handle.downgrade(),
            config.handles.pubsub.clone().unwrap_or_else(|| Arc::new(NoBus)),
            registry.clone(),
            spawn_authority,
            config
                .handles
                .executor
                .clone()
                .unwrap_or_else(|| Arc::new(NoActionExecutor)),
            logger,
        );

        let actor = AgentActor {
            state,
            engine,
            runtime,
            inbox,
            round_retries,
            skip_initial_consensus,
            context_warned: false,
            cancel: supervisor.cancellation_token(),
        };

        // A failed start must not leave the id registered.
        let rollback = |error: SpawnError| {
            if let Some(registry) = &registry {
                registry.unregister(&agent_id);
            }
            error
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        if !supervisor.spawn(actor.run(ready_tx)) {
            return Err(rollback(SpawnError::ScopeClosed));
        }
        if ready_rx.await.is_err() {
            return Err(rollback(SpawnError::StartupFailed(agent_id.clone())));
        }
        Ok(handle)
    }

    fn initial_state(
        config: &AgentConfig,
        agent_id: AgentId,
        task_id: TaskId,
        models: Vec<ModelId>,
    ) -> AgentState {
        let mut state = AgentState::new(agent_id, task_id, models)
            .with_context_limit(config.context_limit.unwrap_or(DEFAULT_CONTEXT_LIMIT));
        if let Some(parent) = &config.parent {
            state = state.with_parent(parent.clone());
        }
        if let Some(summary) = &config.summary {
            state = state.with_summary(summary.clone());
        }
        let base_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DECISION_SYSTEM_PROMPT.to_string());
        let system_prompt = match &config.profile {
            Some(profile) => inject_operating_profile(&base_prompt, profile),
            None => base_prompt,
        };
        state = state.with_system_prompt(system_prompt);
        if let Some(prompt) = &config.prompt {
            state = state.with_prompt(prompt.clone());
        }
        state
    }

    // ==================== Mailbox Loop ====================

    async fn run(mut self, ready: oneshot::Sender<()>) {
        info!(
            agent_id = %self.state.agent_id,
            "Agent {} started with {} models",
            self.state.agent_id,
            self.state.models.len()
        );
        self.publish_state();
        self.publish_log(LogLevel::Info, "started");
        if !self.skip_initial_consensus {
            self.schedule_continuation();
        }
        let _ = ready.send(());

        let exit = loop {
            let stimulus = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break ExitReason::Stopped,
                next = self.inbox.recv() => match next {
                    Some(stimulus) => stimulus,
                    None => break ExitReason::Stopped,
                },
            };

            match self.handle(stimulus).await {
                Ok(None) => {}
                Ok(Some(reason)) => break reason,
                Err(e) => {
                    error!(agent_id = %self.state.agent_id, "Agent fault: {}", e);
                    self.publish_log(LogLevel::Error, format!("fault: {}", e));
                    break ExitReason::Failed {
                        error: e.to_string(),
                    };
                }
            }
        };

        self.shutdown(exit);
    }

    async fn handle(&mut self, stimulus: Stimulus) -> Result<Option<ExitReason>, ActorError> {
        match stimulus {
            Stimulus::ContinueConsensus => {
                self.state.consensus_scheduled = false;
                self.run_consensus(None).await
            }
            Stimulus::Snapshot(reply) => {
                let _ = reply.send(self.state.clone());
                Ok(None)
            }
            Stimulus::Stop => Ok(Some(ExitReason::Stopped)),
            Stimulus::AgentMessage { from, content } => {
                self.runtime.bus.publish(
                    &messages_topic(&self.state.agent_id),
                    BusEvent::message(&self.state.agent_id, from.clone(), content.clone()),
                );
                self.route(Inbound::AgentMessage { from, content }).await
            }
            Stimulus::ActionResult { action_id, result } => {
                self.route(Inbound::ActionResult { action_id, result }).await
            }
            Stimulus::TimerExpired { token } => self.route(Inbound::TimerExpired { token }).await,
            Stimulus::ChildStopped { child, reason } => {
                self.runtime.children.remove(&child);
                self.route(Inbound::ChildStopped { child, reason }).await
            }
            Stimulus::Opaque(content) => self.route(Inbound::Opaque(content)).await,
        }
    }

    async fn route(&mut self, inbound: Inbound) -> Result<Option<ExitReason>, ActorError> {
        let routed = MessageRouter::handle_message(&mut self.state, inbound);
        if routed.cancelled_timer.is_some() {
            self.runtime.abort_timer();
        }
        self.publish_state();

        if let Some(token) = routed.wait_expired {
            return self.run_consensus(Some(token)).await;
        }
        if routed.continue_consensus && !self.state.consensus_scheduled {
            self.schedule_continuation();
        }
        Ok(None)
    }

    // ==================== Consensus ====================

    async fn run_consensus(
        &mut self,
        mut expired: Option<TimerToken>,
    ) -> Result<Option<ExitReason>, ActorError> {
        let mut failures = 0;
        loop {
            self.runtime.begin_turn();
            self.check_context_budget();
            let result = match expired.take() {
                Some(token) => {
                    self.engine
                        .handle_wait_timeout(&mut self.state, token, &mut self.runtime)
                        .await
                }
                None => {
                    self.engine
                        .handle_consensus_continuation(&mut self.state, &mut self.runtime)
                        .await
                }
            };

            match result {
                Ok(decision) => {
                    self.publish_log(LogLevel::Info, format!("decided {}", decision.action));
                    self.publish_state();
                    if let Some(reason) = self.runtime.take_exit() {
                        return Ok(Some(reason));
                    }
                    if self.runtime.wants_continuation() && !self.state.consensus_scheduled {
                        self.schedule_continuation();
                    }
                    return Ok(None);
                }
                Err(ConsensusError::Dispatch(e)) => return Err(e),
                Err(e) if e.is_retryable() && failures < self.round_retries => {
                    failures += 1;
                    warn!(
                        agent_id = %self.state.agent_id,
                        "Consensus failed ({}), retrying round ({}/{})",
                        e,
                        failures,
                        self.round_retries
                    );
                    self.publish_log(LogLevel::Warn, format!("retrying round: {}", e));
                    if let ConsensusError::InvalidDecision(reason) = &e {
                        self.state.append_to_all(HistoryEntry::unattributed(json!({
                            "error": "invalid_decision",
                            "reason": reason,
                        })));
                    }
                    tokio::time::sleep(self.engine.retry_policy().delay_for(failures - 1)).await;
                }
                Err(e) => {
                    self.escalate(&e);
                    return Ok(None);
                }
            }
        }
    }

    /// Warn once when the fullest model history nears the context limit.
    fn check_context_budget(&mut self) {
        if self.context_warned
            || !is_near_context_limit(&self.state, CONTEXT_WARNING_THRESHOLD_PCT)
        {
            return;
        }
        self.context_warned = true;
        let percentage = context_usage_percentage(&self.state);
        let estimated = estimate_total_context_tokens(&self.state, None, true);
        warn!(
            agent_id = %self.state.agent_id,
            "Context at {:.0}% of {} tokens (~{} including system prompt)",
            percentage,
            self.state.context_limit,
            estimated
        );
        self.publish_log(
            LogLevel::Warn,
            format!(
                "context near limit: {:.0}% of {} tokens",
                percentage, self.state.context_limit
            ),
        );
        self.runtime.logger.log(ConversationEvent::new(
            "context_near_limit",
            json!({
                "agent_id": self.state.agent_id.as_str(),
                "usage_pct": percentage,
                "estimated_tokens": estimated,
                "context_limit": self.state.context_limit,
            }),
        ));
    }

    /// Report a failed consensus to the parent and wait for input.
    fn escalate(&mut self, e: &ConsensusError) {
        warn!(agent_id = %self.state.agent_id, "Escalating consensus failure: {}", e);
        self.publish_log(LogLevel::Error, format!("consensus failed: {}", e));
        if let Some(parent) = self.runtime.parent.as_ref().and_then(|p| p.upgrade()) {
            let content = json!({ "error": "consensus_failed", "reason": e.to_string() });
            if parent
                .send_message(Sender::Agent(self.state.agent_id.clone()), content)
                .is_err()
            {
                debug!(agent_id = %self.state.agent_id, "Parent gone; failure not escalated");
            }
        }
        self.runtime.wait_for_input(&mut self.state);
        self.publish_state();
    }

    fn schedule_continuation(&mut self) {
        if let Some(handle) = self.runtime.self_address.upgrade() {
            schedule_consensus_continuation(&mut self.state, handle.mailbox());
        }
    }

    // ==================== Shutdown ====================

    fn shutdown(mut self, reason: ExitReason) {
        let agent_id = self.state.agent_id.clone();
        self.runtime.abort_timer();
        self.state.wait_timer = None;

        for (child_id, child) in self.runtime.children.drain() {
            if child.stop().is_err() {
                debug!(agent_id = %agent_id, "Child {} already stopped", child_id);
            }
        }

        self.state.status = AgentStatus::Stopped;
        self.publish_state();
        self.publish_log(LogLevel::Info, format!("stopped: {}", reason.to_value()));

        if let Some(registry) = &self.runtime.registry {
            registry.unregister(&agent_id);
        }
        if let Some(parent) = self.runtime.parent.as_ref().and_then(|p| p.upgrade()) {
            let _ = parent.send(Stimulus::ChildStopped {
                child: agent_id.clone(),
                reason: reason.clone(),
            });
        }

        self.runtime.logger.log(ConversationEvent::new(
            "agent_stopped",
            json!({ "agent_id": agent_id.as_str(), "reason": reason.to_value() }),
        ));
        info!(agent_id = %agent_id, "Agent {} stopped", agent_id);
    }

    // ==================== Bus ====================

    fn publish_state(&self) {
        self.runtime.bus.publish(
            &state_topic(&self.state.agent_id),
            BusEvent::state_update(&self.state),
        );
    }

    fn publish_log(&self, level: LogLevel, message: impl Into<String>) {
        self.runtime.bus.publish(
            &logs_topic(&self.state.agent_id),
            BusEvent::log(&self.state.agent_id, level, message),
        );
    }
}
