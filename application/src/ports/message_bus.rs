//! Message bus port
//!
//! Topic-based publish/subscribe used by agents to broadcast observable
//! events (`agents:<id>:state`, `agents:<id>:logs`, `agents:<id>:messages`).
//! Agents holding different bus handles never see each other's events.

use quorum_domain::BusEvent;
use tokio::sync::broadcast;

/// Port for publishing and subscribing to agent topics.
pub trait MessageBus: Send + Sync {
    /// Publish an event. Returns the number of subscribers that received it.
    fn publish(&self, topic: &str, event: BusEvent) -> usize;

    /// Subscribe to a topic. Only events published after this call are received.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusEvent>;
}

/// Bus that drops every event. Used when no bus is configured.
pub struct NoBus;

impl MessageBus for NoBus {
    fn publish(&self, _topic: &str, _event: BusEvent) -> usize {
        0
    }

    fn subscribe(&self, _topic: &str) -> broadcast::Receiver<BusEvent> {
        let (_tx, rx) = broadcast::channel(1);
        rx
    }
}
