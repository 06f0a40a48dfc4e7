//! Addressing a running agent: mailbox handles and the stimulus protocol.

use super::ActorError;
use quorum_domain::{ActionId, AgentId, AgentState, Sender, TimerToken};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// Everything an agent's mailbox accepts.
#[derive(Debug)]
pub enum Stimulus {
    /// Message from the parent, a child or a sibling
    AgentMessage { from: Sender, content: Value },
    /// Result of an action dispatched to the executor
    ActionResult { action_id: ActionId, result: Value },
    /// A wait timer fired
    TimerExpired { token: TimerToken },
    /// Payload without a known shape; recorded, never triggers consensus
    Opaque(Value),
    /// Self-directed signal to run the next consensus round
    ContinueConsensus,
    /// A child terminated
    ChildStopped { child: AgentId, reason: ExitReason },
    /// Request a copy of the current state
    Snapshot(oneshot::Sender<AgentState>),
    /// Stop the agent and its children
    Stop,
}

/// Why an agent terminated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExitReason {
    /// The agent finished its task
    Done { result: Value },
    /// An error escaped a handler
    Failed { error: String },
    /// Stopped by its parent, its handle holders or scope shutdown
    Stopped,
}

impl ExitReason {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Address of a running agent.
///
/// Holding a handle keeps the agent's mailbox open. The agent stops once
/// every handle is dropped and its mailbox is drained.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    id: AgentId,
    mailbox: mpsc::UnboundedSender<Stimulus>,
}

impl AgentHandle {
    pub(crate) fn new(id: AgentId, mailbox: mpsc::UnboundedSender<Stimulus>) -> Self {
        Self { id, mailbox }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn send(&self, stimulus: Stimulus) -> Result<(), ActorError> {
        self.mailbox
            .send(stimulus)
            .map_err(|_| ActorError::MailboxClosed(self.id.clone()))
    }

    /// Deliver an agent message.
    pub fn send_message(&self, from: Sender, content: Value) -> Result<(), ActorError> {
        self.send(Stimulus::AgentMessage { from, content })
    }

    pub fn stop(&self) -> Result<(), ActorError> {
        self.send(Stimulus::Stop)
    }

    /// Copy of the agent's state, taken between two stimuli.
    pub async fn snapshot(&self) -> Result<AgentState, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send(Stimulus::Snapshot(tx))?;
        rx.await
            .map_err(|_| ActorError::MailboxClosed(self.id.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Resolves once the agent has terminated.
    pub async fn closed(&self) {
        self.mailbox.closed().await
    }

    pub fn downgrade(&self) -> WeakAgentHandle {
        WeakAgentHandle {
            id: self.id.clone(),
            mailbox: self.mailbox.downgrade(),
        }
    }

    pub(crate) fn mailbox(&self) -> &mpsc::UnboundedSender<Stimulus> {
        &self.mailbox
    }
}

/// Non-owning address; children reach their parent through one.
#[derive(Debug, Clone)]
pub struct WeakAgentHandle {
    id: AgentId,
    mailbox: mpsc::WeakUnboundedSender<Stimulus>,
}

impl WeakAgentHandle {
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn upgrade(&self) -> Option<AgentHandle> {
        self.mailbox
            .upgrade()
            .map(|mailbox| AgentHandle::new(self.id.clone(), mailbox))
    }
}
