//! Topic-based event bus implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::CombatEvent;

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Combat started, ended or recovered
    Lifecycle,
    /// Turn and round transitions, roster changes
    Turn,
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Cloning shares the underlying channels.
#[derive(Clone)]
pub struct EventBus {
    lifecycle: broadcast::Sender<CombatEvent>,
    turn: broadcast::Sender<CombatEvent>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lifecycle: broadcast::channel(capacity).0,
            turn: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<CombatEvent> {
        match topic {
            Topic::Lifecycle => &self.lifecycle,
            Topic::Turn => &self.turn,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: CombatEvent) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<CombatEvent> {
        self.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<CombatEvent>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_started(round_number: u32) -> CombatEvent {
        CombatEvent::RoundStarted {
            campaign_id: "c".into(),
            session_id: "s".into(),
            round_number,
        }
    }

    #[tokio::test]
    async fn events_route_by_topic() {
        let bus = EventBus::with_capacity(8);
        let mut turns = bus.subscribe(Topic::Turn);
        let mut lifecycle = bus.subscribe(Topic::Lifecycle);

        bus.publish(round_started(2));

        assert_eq!(turns.recv().await.unwrap(), round_started(2));
        assert!(lifecycle.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(round_started(1));
    }
}
