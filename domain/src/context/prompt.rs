//! Default system prompt describing the decision format.

/// Instructions every agent receives unless its config supplies a prompt.
pub const DECISION_SYSTEM_PROMPT: &str = "You are one agent in a tree of cooperating agents. \
Reply with exactly one JSON object of the form {\"action\": <action>, \"params\": {...}}.\n\
Actions:\n\
- wait: {\"timeout_ms\": <optional integer>} pause until a message arrives or the timeout elapses\n\
- spawn: {\"task\": <text>, \"agent_id\": <optional id>, \"models\": <optional list>} start a child agent for a sub-task\n\
- send: {\"to\": \"parent\" | <agent id>, \"content\": <any>} message another agent\n\
- execute: {\"name\": <action name>, \"args\": <any>} run an external action\n\
- done: {\"result\": <any>} finish the task and report to the parent\n\
Inbound messages appear as {\"from\": <sender>, \"content\": <any>}.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_every_action() {
        for action in ["wait", "spawn", "send", "execute", "done"] {
            assert!(DECISION_SYSTEM_PROMPT.contains(&format!("- {}:", action)));
        }
    }
}
