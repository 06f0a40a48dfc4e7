//! Decision parsing for model replies.
//!
//! Models are asked to reply with `{"action": ..., "params": {...}}`. In
//! practice the JSON may be wrapped in prose or a markdown code fence, so the
//! object is located before being deserialized.

use crate::agent::action::Decision;
use crate::core::error::DomainError;
use crate::core::string::truncate;

/// Parse a model reply into a [`Decision`].
///
/// # Supported Formats
///
/// 1. Bare JSON: `{"action": "wait", "params": {}}`
/// 2. JSON inside a ```` ```json ```` fence
/// 3. JSON embedded in surrounding prose (first `{` to last `}`)
///
/// ```
/// use quorum_domain::quorum::parse_decision;
/// use quorum_domain::agent::ActionKind;
///
/// let d = parse_decision(r#"Sure: {"action": "done", "params": {"result": 1}}"#).unwrap();
/// assert_eq!(d.action, ActionKind::Done);
/// ```
pub fn parse_decision(response: &str) -> Result<Decision, DomainError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidDecision("empty reply".to_string()));
    }

    if let Ok(decision) = serde_json::from_str::<Decision>(trimmed) {
        return Ok(decision);
    }

    if let Some(fenced) = extract_fenced_block(trimmed)
        && let Ok(decision) = serde_json::from_str::<Decision>(fenced)
    {
        return Ok(decision);
    }

    if let Some(start) = trimmed.find('{')
        && let Some(end) = trimmed.rfind('}')
        && end > start
    {
        return serde_json::from_str::<Decision>(&trimmed[start..=end]).map_err(|e| {
            DomainError::InvalidDecision(format!("{} in reply: {}", e, truncate(trimmed, 120)))
        });
    }

    Err(DomainError::InvalidDecision(format!(
        "no JSON object in reply: {}",
        truncate(trimmed, 120)
    )))
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    let body_start = after_ticks.find('\n')? + 1;
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::action::ActionKind;
    use serde_json::json;

    #[test]
    fn test_parse_bare_json() {
        let d = parse_decision(r#"{"action": "wait", "params": {"timeout_ms": 100}}"#).unwrap();
        assert_eq!(d.action, ActionKind::Wait);
        assert_eq!(d.params, json!({"timeout_ms": 100}));
    }

    #[test]
    fn test_parse_fenced_json() {
        let response = r#"
Here is my decision:
```json
{"action": "send", "params": {"to": "parent", "content": "hi"}}
```
"#;
        let d = parse_decision(response).unwrap();
        assert_eq!(d.action, ActionKind::Send);
    }

    #[test]
    fn test_parse_embedded_json() {
        let d = parse_decision(r#"I think {"action": "finish", "params": {}} is right."#).unwrap();
        assert_eq!(d.action, ActionKind::Done);
    }

    #[test]
    fn test_missing_params_defaults_to_null() {
        let d = parse_decision(r#"{"action": "wait"}"#).unwrap();
        assert!(d.params.is_null());
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_decision("").is_err());
        assert!(parse_decision("I refuse to answer").is_err());
        assert!(parse_decision(r#"{"action": "dance"}"#).is_err());
        assert!(matches!(
            parse_decision("{not json}"),
            Err(DomainError::InvalidDecision(_))
        ));
    }
}
