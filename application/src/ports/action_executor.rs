//! Action executor port
//!
//! Runs the external actions chosen through `execute` decisions. The result
//! comes back to the agent as an action result stimulus.

use async_trait::async_trait;
use quorum_domain::AgentId;
use serde_json::Value;

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute `name` with `args` on behalf of `agent_id`.
    async fn execute(&self, agent_id: &AgentId, name: &str, args: &Value) -> Result<Value, String>;
}

/// Executor that rejects every action. Used when none is configured.
pub struct NoActionExecutor;

#[async_trait]
impl ActionExecutor for NoActionExecutor {
    async fn execute(&self, _agent_id: &AgentId, name: &str, _args: &Value) -> Result<Value, String> {
        Err(format!("no action executor configured for '{}'", name))
    }
}
