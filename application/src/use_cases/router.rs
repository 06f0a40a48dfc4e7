//! Message Router
//!
//! Single normalization point for inbound stimuli. Every handler records the
//! stimulus in history, applies its timer effect and reports whether a
//! consensus continuation is due. Nothing is left in `queued_messages` when a
//! handler returns.

use crate::use_cases::actor::ExitReason;
use quorum_domain::{
    ActionId, AgentId, AgentState, AgentStatus, HistoryEntry, Sender, TimerToken, WaitTimer,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Stimuli the router knows how to record.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    AgentMessage { from: Sender, content: Value },
    ActionResult { action_id: ActionId, result: Value },
    TimerExpired { token: TimerToken },
    ChildStopped { child: AgentId, reason: ExitReason },
    Opaque(Value),
}

/// Effect of one router pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routed {
    /// A consensus continuation should be scheduled
    pub continue_consensus: bool,
    /// The wait timer that was cancelled, if any
    pub cancelled_timer: Option<WaitTimer>,
    /// Set when the active wait timer fired
    pub wait_expired: Option<TimerToken>,
}

pub struct MessageRouter;

impl MessageRouter {
    /// Generic entry point.
    pub fn handle_message(state: &mut AgentState, inbound: Inbound) -> Routed {
        match inbound {
            Inbound::AgentMessage { from, content } => {
                Self::handle_agent_message(state, from, content)
            }
            Inbound::ActionResult { action_id, result } => {
                Self::handle_action_result(state, action_id, result)
            }
            Inbound::ChildStopped { child, reason } => {
                Self::handle_child_stopped(state, child, reason)
            }
            Inbound::TimerExpired { token } => {
                // Only the exact active token may cancel; a stale signal must
                // not clear a timer armed after it was sent.
                if state.active_timer_token() == Some(token) {
                    let cancelled = state.cancel_wait_timer();
                    Routed {
                        continue_consensus: false,
                        cancelled_timer: cancelled,
                        wait_expired: Some(token),
                    }
                } else {
                    debug!(
                        agent_id = %state.agent_id,
                        "Ignoring stale timer signal {}",
                        token
                    );
                    Routed::default()
                }
            }
            Inbound::Opaque(content) => {
                state.enqueue_message(HistoryEntry::unattributed(content));
                state.flush_queued_messages();
                Routed::default()
            }
        }
    }

    /// Record a message from another agent and reset any wait.
    pub fn handle_agent_message(state: &mut AgentState, from: Sender, content: Value) -> Routed {
        state.enqueue_message(HistoryEntry::event(from, content));
        state.flush_queued_messages();
        let cancelled = state.cancel_wait_timer();
        Routed {
            continue_consensus: true,
            cancelled_timer: cancelled,
            wait_expired: None,
        }
    }

    /// Record the result of a dispatched action.
    pub fn handle_action_result(state: &mut AgentState, action_id: ActionId, result: Value) -> Routed {
        if state.complete_pending_action(&action_id).is_none() {
            warn!(
                agent_id = %state.agent_id,
                "Result for unknown action {}",
                action_id
            );
        }
        state.enqueue_message(HistoryEntry::result(action_id, result));
        state.flush_queued_messages();
        let cancelled = state.cancel_wait_timer();
        if state.status == AgentStatus::Executing && state.pending_actions.is_empty() {
            state.status = AgentStatus::Ready;
        }
        Routed {
            continue_consensus: true,
            cancelled_timer: cancelled,
            wait_expired: None,
        }
    }

    /// Forget a terminated child and tell the models why it stopped.
    pub fn handle_child_stopped(state: &mut AgentState, child: AgentId, reason: ExitReason) -> Routed {
        state.remove_child(&child);
        let content = json!({ "child_stopped": reason.to_value() });
        state.enqueue_message(HistoryEntry::event(Sender::Agent(child), content));
        state.flush_queued_messages();
        let cancelled = state.cancel_wait_timer();
        Routed {
            continue_consensus: true,
            cancelled_timer: cancelled,
            wait_expired: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_domain::{EntryKind, ModelId, TaskId, WaitKind};
    use std::time::Duration;

    fn state() -> AgentState {
        AgentState::new(
            AgentId::new("agent"),
            TaskId::new("task"),
            vec![ModelId::new("m1"), ModelId::new("m2")],
        )
    }

    fn last_entry(state: &AgentState, model: &str) -> EntryKind {
        state
            .history(&ModelId::new(model))
            .and_then(|h| h.last())
            .map(|e| e.kind.clone())
            .unwrap()
    }

    #[test]
    fn test_parent_message_cancels_wait_and_continues() {
        let mut state = state();
        state.arm_wait_timer(WaitKind::Timeout(Duration::from_secs(10)));

        let routed = MessageRouter::handle_agent_message(&mut state, Sender::Parent, json!("go"));

        assert!(routed.continue_consensus);
        assert!(routed.cancelled_timer.is_some());
        assert!(state.wait_timer.is_none());
        assert!(state.queued_messages.is_empty());
        for model in ["m1", "m2"] {
            assert_eq!(
                last_entry(&state, model),
                EntryKind::Event {
                    from: Some(Sender::Parent),
                    content: json!("go")
                }
            );
        }
        let rendered = serde_json::to_value(&state.history(&ModelId::new("m1")).unwrap()[0]).unwrap();
        assert_eq!(rendered["from"], "parent");
    }

    #[test]
    fn test_sibling_message_uses_raw_id() {
        let mut state = state();
        MessageRouter::handle_agent_message(&mut state, Sender::Agent(AgentId::new("sib-1")), json!(1));
        let entry = &state.history(&ModelId::new("m1")).unwrap()[0];
        let value = serde_json::to_value(entry).unwrap();
        assert_eq!(value["from"], "sib-1");
    }

    #[test]
    fn test_message_without_timer() {
        let mut state = state();
        let routed = MessageRouter::handle_agent_message(&mut state, Sender::Parent, json!("x"));
        assert!(routed.continue_consensus);
        assert!(routed.cancelled_timer.is_none());
    }

    #[test]
    fn test_matching_timer_token_cancels() {
        let mut state = state();
        let (token, _) = state.arm_wait_timer(WaitKind::Timeout(Duration::from_millis(5)));

        let routed = MessageRouter::handle_message(&mut state, Inbound::TimerExpired { token });

        assert_eq!(routed.wait_expired, Some(token));
        assert!(!routed.continue_consensus);
        assert!(state.wait_timer.is_none());
    }

    #[test]
    fn test_stale_timer_token_is_ignored() {
        let mut state = state();
        let (stale, _) = state.arm_wait_timer(WaitKind::Timeout(Duration::from_millis(5)));
        let (fresh, _) = state.arm_wait_timer(WaitKind::Timeout(Duration::from_millis(5)));
        assert_ne!(stale, fresh);

        let routed = MessageRouter::handle_message(&mut state, Inbound::TimerExpired { token: stale });

        assert_eq!(routed, Routed::default());
        assert_eq!(state.active_timer_token(), Some(fresh));
    }

    #[test]
    fn test_action_result_clears_pending() {
        let mut state = state();
        let id = state.register_pending_action("lookup", json!({"q": 1}));
        state.status = AgentStatus::Executing;
        state.arm_wait_timer(WaitKind::Input);

        let routed = MessageRouter::handle_action_result(&mut state, id.clone(), json!({"ok": true}));

        assert!(routed.continue_consensus);
        assert!(state.pending_actions.is_empty());
        assert!(state.wait_timer.is_none());
        assert_eq!(state.status, AgentStatus::Ready);
        assert_eq!(
            last_entry(&state, "m2"),
            EntryKind::Result {
                action_id: id,
                result: json!({"ok": true})
            }
        );
    }

    #[test]
    fn test_opaque_payload_recorded_without_continuation() {
        let mut state = state();
        let routed = MessageRouter::handle_message(&mut state, Inbound::Opaque(json!({"ping": 1})));
        assert!(!routed.continue_consensus);
        assert_eq!(
            last_entry(&state, "m1"),
            EntryKind::Event {
                from: None,
                content: json!({"ping": 1})
            }
        );
        assert!(state.queued_messages.is_empty());
    }

    #[test]
    fn test_child_stopped_removes_child() {
        let mut state = state();
        state.add_child(AgentId::new("kid"));
        let routed = MessageRouter::handle_message(
            &mut state,
            Inbound::ChildStopped {
                child: AgentId::new("kid"),
                reason: ExitReason::Done { result: json!("ok") },
            },
        );
        assert!(routed.continue_consensus);
        assert!(state.children.is_empty());
        match last_entry(&state, "m1") {
            EntryKind::Event { from, content } => {
                assert_eq!(from, Some(Sender::Agent(AgentId::new("kid"))));
                assert_eq!(content["child_stopped"]["status"], "done");
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }
}
