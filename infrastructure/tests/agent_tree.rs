//! End-to-end runs of agent trees over the real adapters.

use quorum_application::{
    AgentConfig, AgentHandle, AgentRegistry, Injected, MessageBus, RetryPolicy, Supervisor,
};
use quorum_domain::events::{logs_topic, messages_topic};
use quorum_domain::{
    AgentId, AgentState, BusEvent, EntryKind, LogLevel, QuorumPolicy, QuorumRule, Sender,
    WaitKind,
};
use quorum_infrastructure::{
    InMemoryRegistry, JsonlConversationLogger, LocalBroadcaster, Script, ScriptedModelGateway,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

struct Tree {
    supervisor: Supervisor,
    bus: Arc<LocalBroadcaster>,
    registry: Arc<InMemoryRegistry>,
    injected: Injected,
}

impl Tree {
    fn new(script: &str, logger: Option<Arc<JsonlConversationLogger>>) -> Self {
        let bus = Arc::new(LocalBroadcaster::new());
        let registry = Arc::new(InMemoryRegistry::new());
        let gateway = Arc::new(ScriptedModelGateway::new(Script::from_json(script).unwrap()));
        let mut injected = Injected::new()
            .with_gateway(gateway)
            .with_pubsub(bus.clone())
            .with_registry(registry.clone());
        if let Some(logger) = logger {
            injected = injected.with_logger(logger);
        }
        Self {
            supervisor: Supervisor::new(),
            bus,
            registry,
            injected,
        }
    }

    async fn start_root(&self, config: AgentConfig) -> AgentHandle {
        self.supervisor
            .start_agent(config, &self.injected)
            .await
            .unwrap()
    }

    async fn finish(self) {
        self.supervisor.shutdown();
        tokio::time::timeout(Duration::from_secs(2), self.supervisor.join())
            .await
            .expect("supervision scope should drain");
    }
}

fn root(models: &[&str]) -> AgentConfig {
    AgentConfig::new()
        .with_agent_id("root")
        .with_prompt("write a report")
        .with_models(models.iter().copied())
        .with_retry(RetryPolicy::immediate(1))
}

async fn eventually(handle: &AgentHandle, predicate: impl Fn(&AgentState) -> bool) -> AgentState {
    for _ in 0..200 {
        if let Ok(state) = handle.snapshot().await
            && predicate(&state)
        {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached for {}", handle.id());
}

async fn next_matching(
    rx: &mut broadcast::Receiver<BusEvent>,
    predicate: impl Fn(&BusEvent) -> bool,
) -> BusEvent {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .expect("event should arrive")
}

fn root_events(state: &AgentState) -> Vec<(Option<Sender>, Value)> {
    state
        .model_histories
        .values()
        .next()
        .into_iter()
        .flatten()
        .filter_map(|entry| match &entry.kind {
            EntryKind::Event { from, content } => Some((from.clone(), content.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn child_reports_result_to_parent() {
    let script = r#"{
        "fallback": {"action": "wait", "params": {}},
        "models": {
            "r1": [{"action": "spawn", "params": {"task": "research", "agent_id": "worker", "models": ["w1", "w2", "w3"]}}],
            "r2": [{"action": "spawn", "params": {"task": "research", "agent_id": "worker", "models": ["w1", "w2", "w3"]}}],
            "r3": [{"action": "spawn", "params": {"task": "research", "agent_id": "worker", "models": ["w1", "w2", "w3"]}}],
            "w1": [{"action": "send", "params": {"to": "parent", "content": {"summary": "found"}}},
                   {"action": "done", "params": {"result": "ok"}}],
            "w2": [{"action": "send", "params": {"to": "parent", "content": {"summary": "found"}}},
                   {"action": "done", "params": {"result": "ok"}}],
            "w3": [{"action": "wait", "params": {}},
                   {"action": "done", "params": {"result": "ok"}}]
        }
    }"#;
    let tree = Tree::new(script, None);
    let mut messages = tree.bus.subscribe(&messages_topic(&AgentId::new("root")));
    let handle = tree.start_root(root(&["r1", "r2", "r3"])).await;

    let event = next_matching(&mut messages, |e| matches!(e, BusEvent::MessageEvent { .. })).await;
    match event {
        BusEvent::MessageEvent { from, content, .. } => {
            assert_eq!(from, Sender::Agent(AgentId::new("worker")));
            assert_eq!(content["summary"], "found");
        }
        other => panic!("unexpected event {:?}", other),
    }

    let worker = Some(Sender::Agent(AgentId::new("worker")));
    let state = eventually(&handle, |s| {
        s.children.is_empty()
            && root_events(s)
                .iter()
                .any(|(from, c)| *from == worker && c["child_stopped"]["result"] == "ok")
    })
    .await;
    assert!(matches!(state.wait_timer, Some(t) if t.kind == WaitKind::Input));
    assert!(tree.registry.lookup(&AgentId::new("worker")).is_none());
    assert!(state.token_usage.total > 0);

    let registry = tree.registry.clone();
    tree.finish().await;
    assert!(handle.is_closed());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn failing_model_does_not_block_majority() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("run.jsonl");
    let logger = Arc::new(JsonlConversationLogger::new(&log_path).unwrap());
    let script = r#"{
        "models": {
            "r1": [{"error": "failed", "message": "backend down"}],
            "r2": [{"action": "done", "params": {"result": 42}}],
            "r3": [{"action": "done", "params": {"result": 42}}]
        }
    }"#;
    let tree = Tree::new(script, Some(logger.clone()));
    let handle = tree.start_root(root(&["r1", "r2", "r3"])).await;

    tokio::time::timeout(Duration::from_secs(2), handle.closed())
        .await
        .expect("root should finish");
    assert!(tree.registry.is_empty());
    tree.finish().await;
    drop(logger);

    let lines: Vec<Value> = std::fs::read_to_string(&log_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let round = lines
        .iter()
        .find(|l| l["type"] == "consensus_round")
        .expect("round logged");
    assert_eq!(round["agent_id"], "root");
    assert!(lines.iter().any(|l| l["type"] == "action_dispatched"));
    assert!(lines.iter().any(|l| l["type"] == "agent_stopped"));
}

#[tokio::test]
async fn split_vote_escalates_after_round_retries() {
    let split = r#"[
        {"action": "done", "params": {}},
        {"action": "done", "params": {}},
        {"action": "done", "params": {}}
    ]"#;
    let waits = r#"[
        {"action": "wait", "params": {}},
        {"action": "wait", "params": {}},
        {"action": "wait", "params": {}}
    ]"#;
    let script = format!(
        r#"{{"models": {{"r1": {split}, "r2": {waits}, "r3": {waits}}}}}"#,
        split = split,
        waits = waits
    );
    let tree = Tree::new(&script, None);
    let mut logs = tree.bus.subscribe(&logs_topic(&AgentId::new("root")));
    let config = root(&["r1", "r2", "r3"])
        .with_quorum(QuorumPolicy::default().with_rule(QuorumRule::Unanimous))
        .with_round_retries(2);
    let handle = tree.start_root(config).await;

    let event = next_matching(&mut logs, |e| {
        matches!(e, BusEvent::LogEntry { level: LogLevel::Error, .. })
    })
    .await;
    match event {
        BusEvent::LogEntry { message, .. } => assert!(message.contains("consensus failed")),
        other => panic!("unexpected event {:?}", other),
    }

    let state = eventually(&handle, |s| {
        matches!(s.wait_timer, Some(t) if t.kind == WaitKind::Input)
    })
    .await;
    let decisions = state
        .model_histories
        .values()
        .flatten()
        .filter(|e| matches!(e.kind, EntryKind::Decision { .. }))
        .count();
    assert_eq!(decisions, 0);

    tree.finish().await;
}
