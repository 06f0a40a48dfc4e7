//! Context assembly: per-model history → ordered role-tagged messages.
//!
//! Order of the produced sequence:
//!
//! 1. running summary (if any)
//! 2. externally supplied additional-context messages
//! 3. the model's history, one message per entry
//!
//! Long-term memory or model-state content is never injected here as a
//! system message.

use crate::agent::state::AgentState;
use crate::core::model::ModelId;
use crate::history::{EntryKind, HistoryEntry};
use crate::session::entities::Message;
use serde_json::{Value, json};

/// Optional prompts placed ahead of an assembled conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPrompts {
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
}

/// Build the message sequence sent to `model`.
///
/// Returns an empty sequence when the agent has no history for `model`.
pub fn build_conversation_messages(state: &AgentState, model: &ModelId) -> Vec<Message> {
    let Some(history) = state.history(model) else {
        return Vec::new();
    };

    let mut messages = Vec::with_capacity(history.len() + state.additional_context.len() + 1);
    if let Some(summary) = &state.summary {
        messages.push(Message::user(format!(
            "Summary of the conversation so far:\n{}",
            summary
        )));
    }
    messages.extend(state.additional_context.iter().cloned());
    messages.extend(history.iter().map(render_entry));
    messages
}

/// Render one history entry as a message.
pub fn render_entry(entry: &HistoryEntry) -> Message {
    match &entry.kind {
        EntryKind::Prompt { text } => Message::user(text.clone()),
        EntryKind::Decision { decision } => Message::assistant(
            json!({"action": decision.action, "params": decision.params}).to_string(),
        ),
        EntryKind::Event {
            from: Some(from),
            content,
        } => Message::user(json!({"from": from.as_str(), "content": content}).to_string()),
        EntryKind::Event {
            from: None,
            content,
        } => Message::user(render_unattributed(content)),
        EntryKind::Result { action_id, result } => {
            Message::user(json!({"action_id": action_id, "result": result}).to_string())
        }
        EntryKind::WaitTimeout { token } => {
            Message::user(json!({"event": "wait_timeout", "token": token.value()}).to_string())
        }
    }
}

/// Prepend a system message and/or a user message built from `prompts`.
pub fn inject_field_prompts(messages: Vec<Message>, prompts: &FieldPrompts) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len() + 2);
    if let Some(system) = &prompts.system_prompt {
        out.push(Message::system(system.clone()));
    }
    if let Some(user) = &prompts.user_prompt {
        out.push(Message::user(user.clone()));
    }
    out.extend(messages);
    out
}

// Legacy plain text for string payloads, a readable dump for anything else.
fn render_unattributed(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        other => format!(
            "Event: {}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}
