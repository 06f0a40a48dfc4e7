//! Test doubles shared by the actor and supervisor tests.

use crate::ports::action_executor::ActionExecutor;
use crate::ports::agent_registry::{AgentRegistry, RegistryError};
use crate::ports::message_bus::MessageBus;
use crate::ports::model_gateway::{GatewayError, ModelGateway};
use crate::use_cases::actor::AgentHandle;
use async_trait::async_trait;
use quorum_domain::{AgentId, AgentState, BusEvent, Message, ModelId, ModelResponse, QueryOptions};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

pub(crate) const WAIT_FOR_INPUT: &str = r#"{"action": "wait", "params": {}}"#;

/// Gateway replying from a per-model queue, then with a fallback reply.
pub(crate) struct ScriptedGateway {
    replies: Mutex<HashMap<ModelId, VecDeque<Result<String, GatewayError>>>>,
    fallback: Option<String>,
    pub(crate) calls: Mutex<Vec<(ModelId, Vec<Message>)>>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            fallback: Some(WAIT_FOR_INPUT.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail once the queue is empty instead of waiting for input.
    pub(crate) fn failing_when_empty(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub(crate) fn reply(self, model: &str, reply: &str) -> Self {
        self.push(model, Ok(reply.to_string()));
        self
    }

    pub(crate) fn push(&self, model: &str, reply: Result<String, GatewayError>) {
        self.replies
            .lock()
            .unwrap()
            .entry(ModelId::new(model))
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn calls_for(&self, model: &str) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m.as_str() == model)
            .map(|(_, messages)| messages.clone())
            .collect()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn query_model(
        &self,
        model: &ModelId,
        messages: &[Message],
        _options: &QueryOptions,
    ) -> Result<ModelResponse, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.clone(), messages.to_vec()));
        let next = self
            .replies
            .lock()
            .unwrap()
            .get_mut(model)
            .and_then(|queue| queue.pop_front());
        match (next, &self.fallback) {
            (Some(reply), _) => reply.map(|content| ModelResponse::new(model.clone(), content)),
            (None, Some(fallback)) => Ok(ModelResponse::new(model.clone(), fallback.clone())),
            (None, None) => Err(GatewayError::ModelNotAvailable(model.to_string())),
        }
    }
}

/// Minimal topic bus.
#[derive(Default)]
pub(crate) struct TestBus {
    topics: Mutex<HashMap<String, broadcast::Sender<BusEvent>>>,
}

impl TestBus {
    fn sender(&self, topic: &str) -> broadcast::Sender<BusEvent> {
        self.topics
            .lock()
            .unwrap()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }
}

impl MessageBus for TestBus {
    fn publish(&self, topic: &str, event: BusEvent) -> usize {
        self.sender(topic).send(event).unwrap_or(0)
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusEvent> {
        self.sender(topic).subscribe()
    }
}

#[derive(Default)]
pub(crate) struct TestRegistry {
    agents: Mutex<HashMap<AgentId, AgentHandle>>,
}

impl AgentRegistry for TestRegistry {
    fn register(&self, id: AgentId, handle: AgentHandle) -> Result<(), RegistryError> {
        let mut agents = self.agents.lock().unwrap();
        if agents.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        agents.insert(id, handle);
        Ok(())
    }

    fn unregister(&self, id: &AgentId) {
        self.agents.lock().unwrap().remove(id);
    }

    fn lookup(&self, id: &AgentId) -> Option<AgentHandle> {
        self.agents.lock().unwrap().get(id).cloned()
    }
}

/// Executor echoing its arguments back under `"echo"`.
pub(crate) struct EchoExecutor;

#[async_trait]
impl ActionExecutor for EchoExecutor {
    async fn execute(&self, _agent_id: &AgentId, name: &str, args: &Value) -> Result<Value, String> {
        Ok(serde_json::json!({ "name": name, "echo": args }))
    }
}

/// Poll `handle` until `predicate` holds on its state.
pub(crate) async fn eventually<F>(handle: &AgentHandle, predicate: F) -> AgentState
where
    F: Fn(&AgentState) -> bool,
{
    for _ in 0..200 {
        if let Ok(state) = handle.snapshot().await
            && predicate(&state)
        {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached for agent {}", handle.id());
}
