//! Agent state owned by a single actor.
//!
//! [`AgentState`] is plain data: it is mutated only by the actor that owns it,
//! one stimulus at a time, so it needs no interior synchronization.

use crate::agent::value_objects::{ActionId, AgentId, TaskId, TimerToken};
use crate::context::tokens::TokenUsage;
use crate::core::clock::now_millis;
use crate::core::model::ModelId;
use crate::history::HistoryEntry;
use crate::session::entities::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

/// Default per-model token budget.
pub const DEFAULT_CONTEXT_LIMIT: usize = 128_000;

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Idle, ready for the next stimulus
    Ready,
    /// A wait timer is armed
    Waiting,
    /// A consensus round or action is running
    Executing,
    /// Terminal
    Stopped,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Ready => "ready",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Executing => "executing",
            AgentStatus::Stopped => "stopped",
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, AgentStatus::Stopped)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an armed wait timer is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitKind {
    /// Fires after the duration unless a stimulus arrives first
    Timeout(Duration),
    /// Waits for external input only; never fires on its own
    Input,
}

/// The single active wait timer of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitTimer {
    pub token: TimerToken,
    pub kind: WaitKind,
}

/// An action dispatched to the external executor and awaiting its result.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub name: String,
    pub args: Value,
    pub dispatched_at: u64,
}

/// Mutable state of one agent.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub agent_id: AgentId,
    pub task_id: TaskId,
    /// Identity of the parent, used for attribution only
    pub parent: Option<AgentId>,
    pub children: BTreeSet<AgentId>,
    /// Models in configuration order
    pub models: Vec<ModelId>,
    pub model_histories: BTreeMap<ModelId, Vec<HistoryEntry>>,
    pub pending_actions: HashMap<ActionId, PendingAction>,
    pub wait_timer: Option<WaitTimer>,
    pub consensus_scheduled: bool,
    /// Transient buffer, always empty once a router pass returns
    pub queued_messages: Vec<HistoryEntry>,
    pub token_usage: TokenUsage,
    pub context_limit: usize,
    pub summary: Option<String>,
    pub additional_context: Vec<Message>,
    pub system_prompt: Option<String>,
    pub status: AgentStatus,
    timer_seq: u64,
    action_seq: u64,
}

impl AgentState {
    /// Create a state with one empty history per model.
    pub fn new(agent_id: AgentId, task_id: TaskId, models: Vec<ModelId>) -> Self {
        let model_histories = models.iter().map(|m| (m.clone(), Vec::new())).collect();
        Self {
            agent_id,
            task_id,
            parent: None,
            children: BTreeSet::new(),
            models,
            model_histories,
            pending_actions: HashMap::new(),
            wait_timer: None,
            consensus_scheduled: false,
            queued_messages: Vec::new(),
            token_usage: TokenUsage::default(),
            context_limit: DEFAULT_CONTEXT_LIMIT,
            summary: None,
            additional_context: Vec::new(),
            system_prompt: None,
            status: AgentStatus::Ready,
            timer_seq: 0,
            action_seq: 0,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_parent(mut self, parent: AgentId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    /// Record the initiating prompt on every model history.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.append_to_all(HistoryEntry::prompt(prompt));
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

    pub fn with_additional_context(mut self, messages: Vec<Message>) -> Self {
        self.additional_context = messages;
        self
    }

    // ==================== History ====================

    /// Append a copy of `entry` to every model's history.
    pub fn append_to_all(&mut self, entry: HistoryEntry) {
        for history in self.model_histories.values_mut() {
            history.push(entry.clone());
        }
    }

    pub fn history(&self, model: &ModelId) -> Option<&[HistoryEntry]> {
        self.model_histories.get(model).map(Vec::as_slice)
    }

    /// Buffer an inbound message until the next flush.
    pub fn enqueue_message(&mut self, entry: HistoryEntry) {
        self.queued_messages.push(entry);
    }

    /// Move every queued message into all model histories, in arrival order.
    ///
    /// Returns the number of messages flushed.
    pub fn flush_queued_messages(&mut self) -> usize {
        let queued = std::mem::take(&mut self.queued_messages);
        let count = queued.len();
        for entry in queued {
            self.append_to_all(entry);
        }
        count
    }

    // ==================== Wait Timer ====================

    /// Arm a new wait timer with a fresh token, replacing any previous one.
    ///
    /// Returns the new token and the timer it replaced.
    pub fn arm_wait_timer(&mut self, kind: WaitKind) -> (TimerToken, Option<WaitTimer>) {
        self.timer_seq += 1;
        let token = TimerToken::new(self.timer_seq);
        let previous = self.wait_timer.replace(WaitTimer { token, kind });
        self.status = AgentStatus::Waiting;
        (token, previous)
    }

    /// Clear the wait timer regardless of its token.
    pub fn cancel_wait_timer(&mut self) -> Option<WaitTimer> {
        let cancelled = self.wait_timer.take();
        if cancelled.is_some() && self.status == AgentStatus::Waiting {
            self.status = AgentStatus::Ready;
        }
        cancelled
    }

    /// Clear the wait timer only if `token` is the active one.
    pub fn cancel_wait_timer_if(&mut self, token: TimerToken) -> bool {
        match self.wait_timer {
            Some(timer) if timer.token == token => {
                self.cancel_wait_timer();
                true
            }
            _ => false,
        }
    }

    pub fn active_timer_token(&self) -> Option<TimerToken> {
        self.wait_timer.map(|t| t.token)
    }

    // ==================== Pending Actions ====================

    /// Register an action awaiting its result and return its correlation id.
    pub fn register_pending_action(&mut self, name: impl Into<String>, args: Value) -> ActionId {
        self.action_seq += 1;
        let id = ActionId::new(format!("{}-action-{}", self.agent_id, self.action_seq));
        self.pending_actions.insert(
            id.clone(),
            PendingAction {
                name: name.into(),
                args,
                dispatched_at: now_millis(),
            },
        );
        id
    }

    pub fn complete_pending_action(&mut self, id: &ActionId) -> Option<PendingAction> {
        self.pending_actions.remove(id)
    }

    // ==================== Children ====================

    pub fn add_child(&mut self, child: AgentId) -> bool {
        self.children.insert(child)
    }

    pub fn remove_child(&mut self, child: &AgentId) -> bool {
        self.children.remove(child)
    }
}
