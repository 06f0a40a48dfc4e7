//! Action dispatch for a running agent.
//!
//! [`ActorRuntime`] owns everything an agent needs besides its state: the
//! injected handles, the live addresses of its parent and children and the
//! running timer task. It carries out the actions agreed by consensus.

use super::handle::{AgentHandle, ExitReason, Stimulus, WeakAgentHandle};
use super::ActorError;
use crate::config::{AgentConfig, ConfigBuilder, Injected};
use crate::ports::action_executor::ActionExecutor;
use crate::ports::agent_registry::AgentRegistry;
use crate::ports::conversation_logger::ConversationLogger;
use crate::ports::message_bus::MessageBus;
use crate::use_cases::consensus::ContinuationHooks;
use crate::use_cases::supervisor::{SpawnError, Supervisor};
use async_trait::async_trait;
use quorum_domain::{
    Action, AgentId, AgentState, AgentStatus, HistoryEntry, MessageTarget, Sender, SpawnSpec,
    TimerToken, WaitKind,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

pub(crate) struct ActorRuntime {
    /// Effective config, used as the parent side of child propagation
    pub(crate) config: AgentConfig,
    pub(crate) self_address: WeakAgentHandle,
    pub(crate) parent: Option<WeakAgentHandle>,
    pub(crate) children: HashMap<AgentId, AgentHandle>,
    pub(crate) bus: Arc<dyn MessageBus>,
    pub(crate) registry: Option<Arc<dyn AgentRegistry>>,
    pub(crate) supervisor: Supervisor,
    pub(crate) executor: Arc<dyn ActionExecutor>,
    pub(crate) logger: Arc<dyn ConversationLogger>,
    timer_task: Option<AbortHandle>,
    continue_after: bool,
    exit: Option<ExitReason>,
}

impl ActorRuntime {
    pub(crate) fn new(
        config: AgentConfig,
        self_address: WeakAgentHandle,
        bus: Arc<dyn MessageBus>,
        registry: Option<Arc<dyn AgentRegistry>>,
        supervisor: Supervisor,
        executor: Arc<dyn ActionExecutor>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Self {
        let parent = config.parent_address.clone();
        Self {
            config,
            self_address,
            parent,
            children: HashMap::new(),
            bus,
            registry,
            supervisor,
            executor,
            logger,
            timer_task: None,
            continue_after: false,
            exit: None,
        }
    }

    /// Reset per-decision flags before a consensus round.
    pub(crate) fn begin_turn(&mut self) {
        self.continue_after = false;
    }

    /// Whether the last executed action asked for another round.
    pub(crate) fn wants_continuation(&self) -> bool {
        self.continue_after
    }

    pub(crate) fn take_exit(&mut self) -> Option<ExitReason> {
        self.exit.take()
    }

    pub(crate) fn abort_timer(&mut self) {
        if let Some(task) = self.timer_task.take() {
            task.abort();
        }
    }

    /// Arm an input-only wait, replacing any running timer.
    pub(crate) fn wait_for_input(&mut self, state: &mut AgentState) {
        self.arm_wait(state, None);
    }

    // ==================== Handlers ====================

    fn arm_wait(&mut self, state: &mut AgentState, timeout: Option<Duration>) {
        let kind = timeout.map(WaitKind::Timeout).unwrap_or(WaitKind::Input);
        let (token, replaced) = state.arm_wait_timer(kind);
        self.abort_timer();
        if let Some(previous) = replaced {
            debug!(agent_id = %state.agent_id, "Timer {} replaced by {}", previous.token, token);
        }

        if let Some(duration) = timeout {
            let mailbox = self.self_address.clone();
            let task = tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                if let Some(handle) = mailbox.upgrade() {
                    let _ = handle.send(Stimulus::TimerExpired { token });
                }
            });
            self.timer_task = Some(task.abort_handle());
        }
        debug!(agent_id = %state.agent_id, "Waiting ({:?}) with {}", kind, token);
    }

    async fn spawn_child(&mut self, state: &mut AgentState, spec: SpawnSpec) -> Result<(), ActorError> {
        let mut base = AgentConfig::new().with_prompt(spec.task.clone());
        if let Some(id) = spec.agent_id {
            base = base.with_agent_id(id);
        }
        if let Some(models) = spec.models {
            base = base.with_models(models);
        }
        let child_config = ConfigBuilder::propagate_to_children(&self.config, base)
            .with_parent_address(self.self_address.clone());

        self.continue_after = true;
        match self.supervisor.start_agent(child_config, &Injected::default()).await {
            Ok(child) => {
                let child_id = child.id().clone();
                info!(agent_id = %state.agent_id, "Spawned child {}", child_id);
                state.add_child(child_id.clone());
                self.children.insert(child_id.clone(), child);
                state.append_to_all(HistoryEntry::unattributed(json!({
                    "event": "child_spawned",
                    "agent_id": child_id.as_str(),
                    "task": spec.task,
                })));
                Ok(())
            }
            Err(SpawnError::ScopeClosed) => Err(SpawnError::ScopeClosed.into()),
            Err(e) => {
                warn!(agent_id = %state.agent_id, "Failed to spawn child: {}", e);
                state.append_to_all(HistoryEntry::unattributed(json!({
                    "event": "spawn_failed",
                    "task": spec.task,
                    "error": e.to_string(),
                })));
                Ok(())
            }
        }
    }

    fn send_message(&mut self, state: &mut AgentState, to: MessageTarget, content: Value) {
        let me = Sender::Agent(state.agent_id.clone());
        let (target, from) = match &to {
            MessageTarget::Parent => (self.parent.as_ref().and_then(|p| p.upgrade()), me),
            MessageTarget::Agent(id) => match self.children.get(id) {
                Some(child) => (Some(child.clone()), Sender::Parent),
                None => (
                    self.registry.as_ref().and_then(|r| r.lookup(id)),
                    me,
                ),
            },
        };

        self.continue_after = true;
        let delivered = match target {
            Some(handle) => handle.send_message(from, content).map_err(|e| e.to_string()),
            None => Err(format!("unknown recipient '{}'", to)),
        };
        match delivered {
            Ok(()) => debug!(agent_id = %state.agent_id, "Message delivered to {}", to),
            Err(error) => {
                warn!(agent_id = %state.agent_id, "Message to {} not delivered: {}", to, error);
                state.append_to_all(HistoryEntry::unattributed(json!({
                    "event": "send_failed",
                    "to": to.to_string(),
                    "error": error,
                })));
            }
        }
    }

    fn execute(&mut self, state: &mut AgentState, name: String, args: Value) {
        let action_id = state.register_pending_action(name.clone(), args.clone());
        state.status = AgentStatus::Executing;
        info!(agent_id = %state.agent_id, "Executing {} as {}", name, action_id);

        let executor = Arc::clone(&self.executor);
        let mailbox = self.self_address.clone();
        let agent_id = state.agent_id.clone();
        tokio::spawn(async move {
            let result = match executor.execute(&agent_id, &name, &args).await {
                Ok(value) => value,
                Err(error) => json!({ "error": error }),
            };
            if let Some(handle) = mailbox.upgrade() {
                let _ = handle.send(Stimulus::ActionResult { action_id, result });
            }
        });
    }
}

#[async_trait]
impl ContinuationHooks for ActorRuntime {
    fn cancel_timer(&mut self, state: &mut AgentState, token: TimerToken) {
        state.cancel_wait_timer_if(token);
        self.abort_timer();
    }

    async fn execute_action(&mut self, state: &mut AgentState, action: Action) -> Result<(), ActorError> {
        match action {
            Action::Wait { timeout } => self.arm_wait(state, timeout),
            Action::Spawn(spec) => self.spawn_child(state, spec).await?,
            Action::Send { to, content } => self.send_message(state, to, content),
            Action::Execute { name, args } => self.execute(state, name, args),
            Action::Done { result } => {
                info!(agent_id = %state.agent_id, "Task finished");
                self.exit = Some(ExitReason::Done { result });
            }
        }
        Ok(())
    }
}
