//! Broadcast-based topic bus for agent events.

use quorum_application::ports::message_bus::MessageBus;
use quorum_domain::BusEvent;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

/// Default per-topic channel capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// One `broadcast` channel per topic, created on first use.
///
/// Non-blocking: `publish` never awaits. Slow receivers lag and lose
/// events rather than blocking the publishing agent.
pub struct LocalBroadcaster {
    topics: RwLock<HashMap<String, broadcast::Sender<BusEvent>>>,
    capacity: usize,
    published: AtomicU64,
}

impl LocalBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            published: AtomicU64::new(0),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BusEvent> {
        if let Ok(topics) = self.topics.read()
            && let Some(tx) = topics.get(topic)
        {
            return tx.clone();
        }
        let mut topics = self
            .topics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .ok()
            .and_then(|topics| topics.get(topic).map(|tx| tx.receiver_count()))
            .unwrap_or(0)
    }

    /// Total number of events published since creation.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for LocalBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for LocalBroadcaster {
    fn publish(&self, topic: &str, event: BusEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let delivered = self.sender(topic).send(event).unwrap_or(0);
        trace!(topic, delivered, "Published bus event");
        delivered
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusEvent> {
        self.sender(topic).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_domain::events::{logs_topic, state_topic};
    use quorum_domain::{AgentId, LogLevel};

    fn log(agent: &str, message: &str) -> BusEvent {
        BusEvent::log(&AgentId::new(agent), LogLevel::Info, message)
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = LocalBroadcaster::new();
        assert_eq!(bus.publish("agents:a:logs", log("a", "hello")), 0);
        assert_eq!(bus.published(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = LocalBroadcaster::new();
        let topic = logs_topic(&AgentId::new("a"));
        let mut rx1 = bus.subscribe(&topic);
        let mut rx2 = bus.subscribe(&topic);
        assert_eq!(bus.subscriber_count(&topic), 2);

        assert_eq!(bus.publish(&topic, log("a", "one")), 2);
        bus.publish(&topic, log("a", "two"));

        for rx in [&mut rx1, &mut rx2] {
            for expected in ["one", "two"] {
                match rx.recv().await.unwrap() {
                    BusEvent::LogEntry { message, .. } => assert_eq!(message, expected),
                    other => panic!("unexpected event {:?}", other),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = LocalBroadcaster::new();
        let a = AgentId::new("a");
        let mut logs = bus.subscribe(&logs_topic(&a));
        let mut states = bus.subscribe(&state_topic(&a));

        bus.publish(&logs_topic(&a), log("a", "only logs"));

        assert!(logs.recv().await.is_ok());
        assert!(states.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_receiver_lags() {
        let bus = LocalBroadcaster::with_capacity(2);
        let mut rx = bus.subscribe("t");
        for i in 0..3 {
            bus.publish("t", log("a", &i.to_string()));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
    }
}
