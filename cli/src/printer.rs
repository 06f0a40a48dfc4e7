//! Terminal rendering of bus events.

use colored::Colorize;
use quorum_domain::{AgentStatus, BusEvent, LogLevel, WaitKind};

/// One line for `event`, or `None` when `quiet` hides it.
pub fn format_event(event: &BusEvent, quiet: bool) -> Option<String> {
    match event {
        BusEvent::StateUpdate {
            agent_id,
            status,
            children,
            pending_actions,
            wait_timer,
            token_usage,
            context_usage,
        } => {
            if quiet {
                return None;
            }
            let status_text = status.to_string();
            let status = match status {
                AgentStatus::Ready => status_text.green(),
                AgentStatus::Waiting => status_text.yellow(),
                AgentStatus::Executing => status_text.cyan(),
                AgentStatus::Stopped => status_text.dimmed(),
            };
            let wait = match wait_timer.map(|t| t.kind) {
                Some(WaitKind::Input) => " wait=input".to_string(),
                Some(WaitKind::Timeout(d)) => format!(" wait={}ms", d.as_millis()),
                None => String::new(),
            };
            Some(format!(
                "{} {} children={} pending={}{} tokens={} context={:.1}%",
                format!("[{}]", agent_id).bold(),
                status,
                children.len(),
                pending_actions,
                wait,
                token_usage.total,
                context_usage
            ))
        }
        BusEvent::LogEntry {
            agent_id,
            level,
            message,
        } => {
            if quiet && *level != LogLevel::Error {
                return None;
            }
            let tag = match level {
                LogLevel::Debug => level.as_str().dimmed(),
                LogLevel::Info => level.as_str().blue(),
                LogLevel::Warn => level.as_str().yellow(),
                LogLevel::Error => level.as_str().red().bold(),
            };
            Some(format!("{} {} {}", format!("[{}]", agent_id).bold(), tag, message))
        }
        BusEvent::MessageEvent {
            agent_id,
            from,
            content,
        } => Some(format!(
            "{} {} {} {}",
            format!("[{}]", agent_id).bold(),
            "<-".magenta(),
            from.to_string().magenta(),
            content
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_domain::{AgentId, Sender};
    use serde_json::json;

    #[test]
    fn test_message_is_always_shown() {
        let event = BusEvent::message(
            &AgentId::new("root"),
            Sender::Agent(AgentId::new("worker")),
            json!({"summary": "found"}),
        );
        let line = format_event(&event, true).unwrap();
        assert!(line.contains("root"));
        assert!(line.contains("worker"));
        assert!(line.contains("found"));
    }

    #[test]
    fn test_quiet_hides_non_error_logs() {
        let info = BusEvent::log(&AgentId::new("a"), LogLevel::Info, "started");
        let error = BusEvent::log(&AgentId::new("a"), LogLevel::Error, "consensus failed");
        assert!(format_event(&info, true).is_none());
        assert!(format_event(&info, false).unwrap().contains("started"));
        assert!(format_event(&error, true).unwrap().contains("consensus failed"));
    }
}
