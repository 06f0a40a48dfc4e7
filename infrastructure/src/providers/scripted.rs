//! Scripted model gateway.
//!
//! Replays canned replies per model, in order. Used for offline runs of the
//! CLI and for end-to-end tests.
//!
//! Script format (JSON):
//!
//! ```json
//! {
//!   "delay_ms": 0,
//!   "fallback": {"action": "wait", "params": {}},
//!   "models": {
//!     "model-a": [
//!       {"action": "spawn", "params": {"task": "research"}},
//!       {"error": "transient", "message": "overloaded"},
//!       "raw reply text"
//!     ]
//!   }
//! }
//! ```
//!
//! Object replies are sent as their JSON text; objects with an `error` field
//! become gateway failures. Once a model's queue is empty the `fallback`
//! reply is used, or the model reports itself unavailable.

use async_trait::async_trait;
use quorum_application::ports::model_gateway::{GatewayError, ModelGateway};
use quorum_domain::context::estimate_tokens;
use quorum_domain::{Message, ModelId, ModelResponse, QueryOptions, UsageRecord};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Could not read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Kind of a scripted failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedFailure {
    Transient,
    RateLimited,
    Timeout,
    Unavailable,
    Failed,
}

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptedReply {
    Text(String),
    Failure {
        error: ScriptedFailure,
        #[serde(default)]
        message: String,
    },
    Json(Value),
}

impl ScriptedReply {
    fn into_result(self, model: &ModelId) -> Result<String, GatewayError> {
        match self {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Json(value) => Ok(value.to_string()),
            ScriptedReply::Failure { error, message } => Err(match error {
                ScriptedFailure::Transient => GatewayError::Transient(message),
                ScriptedFailure::RateLimited => GatewayError::RateLimited,
                ScriptedFailure::Timeout => GatewayError::Timeout,
                ScriptedFailure::Unavailable => GatewayError::ModelNotAvailable(model.to_string()),
                ScriptedFailure::Failed => GatewayError::RequestFailed(message),
            }),
        }
    }
}

/// Parsed script file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    /// Artificial latency before every reply
    pub delay_ms: u64,
    /// Reply once a model's queue is exhausted
    pub fallback: Option<ScriptedReply>,
    pub models: BTreeMap<ModelId, Vec<ScriptedReply>>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Models named in the script, in sorted order.
    pub fn model_ids(&self) -> Vec<ModelId> {
        self.models.keys().cloned().collect()
    }
}

pub struct ScriptedModelGateway {
    queues: Mutex<HashMap<ModelId, VecDeque<ScriptedReply>>>,
    fallback: Option<ScriptedReply>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedModelGateway {
    pub fn new(script: Script) -> Self {
        let queues = script
            .models
            .into_iter()
            .map(|(model, replies)| (model, replies.into_iter().collect()))
            .collect();
        Self {
            queues: Mutex::new(queues),
            fallback: script.fallback,
            delay: Duration::from_millis(script.delay_ms),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        Ok(Self::new(Script::from_file(path)?))
    }

    /// Append a reply to `model`'s queue.
    pub fn push(&self, model: impl Into<ModelId>, reply: ScriptedReply) {
        let mut queues = self
            .queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        queues.entry(model.into()).or_default().push_back(reply);
    }

    /// Replies still queued for `model`.
    pub fn remaining(&self, model: &ModelId) -> usize {
        self.queues
            .lock()
            .map(|queues| queues.get(model).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Number of queries served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_reply(&self, model: &ModelId) -> Option<ScriptedReply> {
        let mut queues = self
            .queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        queues
            .get_mut(model)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ModelGateway for ScriptedModelGateway {
    async fn query_model(
        &self,
        model: &ModelId,
        messages: &[Message],
        _options: &QueryOptions,
    ) -> Result<ModelResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let Some(reply) = self.next_reply(model) else {
            debug!(model = %model, "Script exhausted");
            return Err(GatewayError::ModelNotAvailable(model.to_string()));
        };
        let content = reply.into_result(model)?;

        let prompt_tokens: usize = messages
            .iter()
            .map(|m| estimate_tokens(Some(m.content.as_str())))
            .sum();
        let completion_tokens = estimate_tokens(Some(content.as_str()));
        let usage = UsageRecord::new(prompt_tokens as u64, completion_tokens as u64);
        debug!(model = %model, bytes = content.len(), "Scripted reply");
        Ok(ModelResponse::new(model.clone(), content).with_usage(usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "fallback": {"action": "wait", "params": {}},
        "models": {
            "a": [
                {"action": "done", "params": {"result": 1}},
                {"error": "transient", "message": "busy"},
                "plain text"
            ],
            "b": []
        }
    }"#;

    #[test]
    fn test_parse_script() {
        let script = Script::from_json(SCRIPT).unwrap();
        assert_eq!(script.model_ids(), vec![ModelId::new("a"), ModelId::new("b")]);
        let replies = &script.models[&ModelId::new("a")];
        assert!(matches!(replies[0], ScriptedReply::Json(_)));
        assert_eq!(
            replies[1],
            ScriptedReply::Failure {
                error: ScriptedFailure::Transient,
                message: "busy".to_string()
            }
        );
        assert_eq!(replies[2], ScriptedReply::Text("plain text".to_string()));
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(matches!(Script::from_json("{"), Err(ScriptError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Script::from_file("/nonexistent/script.json"),
            Err(ScriptError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_replays_in_order_then_falls_back() {
        let gateway = ScriptedModelGateway::new(Script::from_json(SCRIPT).unwrap());
        let a = ModelId::new("a");
        let messages = vec![Message::user("hello there")];
        let options = QueryOptions::default();

        let first = gateway.query_model(&a, &messages, &options).await.unwrap();
        let decision: Value = serde_json::from_str(&first.content).unwrap();
        assert_eq!(decision["action"], "done");
        assert!(first.usage.unwrap().prompt_tokens > 0);

        let err = gateway.query_model(&a, &messages, &options).await.unwrap_err();
        assert!(err.is_transient());

        let text = gateway.query_model(&a, &messages, &options).await.unwrap();
        assert_eq!(text.content, "plain text");

        let fallback = gateway.query_model(&a, &messages, &options).await.unwrap();
        assert!(fallback.content.contains("wait"));
        assert_eq!(gateway.calls(), 4);
        assert_eq!(gateway.remaining(&a), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_without_fallback_is_unavailable() {
        let gateway = ScriptedModelGateway::new(Script::default());
        let err = gateway
            .query_model(&ModelId::new("x"), &[], &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ModelNotAvailable(_)));
    }

    #[tokio::test]
    async fn test_push_appends_reply() {
        let gateway = ScriptedModelGateway::new(Script::default());
        gateway.push("m", ScriptedReply::Text("hi".to_string()));
        assert_eq!(gateway.remaining(&ModelId::new("m")), 1);
        let reply = gateway
            .query_model(&ModelId::new("m"), &[], &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "hi");
    }
}
