//! Event bus sinks

use claimline_domain::traits::EventBus;
use claimline_domain::ServiceError;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::info;

/// An event captured by [`MemoryEventBus`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    /// Topic the event was published to
    pub topic: String,
    /// Event payload
    pub payload: Value,
}

/// Event bus that keeps every published event in memory
///
/// Clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventBus {
    events: Arc<Mutex<Vec<PublishedEvent>>>,
}

impl MemoryEventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far
    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events published to one topic
    pub fn events_for(&self, topic: &str) -> Vec<PublishedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.topic == topic)
            .collect()
    }
}

impl EventBus for MemoryEventBus {
    fn publish(&self, topic: &str, payload: Value) -> Result<(), ServiceError> {
        self.events
            .lock()
            .map_err(|_| ServiceError::Unavailable("event bus lock poisoned".into()))?
            .push(PublishedEvent {
                topic: topic.to_string(),
                payload,
            });
        Ok(())
    }
}

/// Event bus that writes events to the log
#[derive(Debug, Clone, Default)]
pub struct LogEventBus;

impl EventBus for LogEventBus {
    fn publish(&self, topic: &str, payload: Value) -> Result<(), ServiceError> {
        info!("event {}: {}", topic, payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_bus_records_events() {
        let bus = MemoryEventBus::new();
        let shared = bus.clone();

        bus.publish("a", json!({"n": 1})).unwrap();
        bus.publish("b", json!({"n": 2})).unwrap();
        bus.publish("a", json!({"n": 3})).unwrap();

        assert_eq!(shared.events().len(), 3);
        assert_eq!(shared.events_for("a").len(), 2);
        assert_eq!(shared.events_for("b")[0].payload, json!({"n": 2}));
    }
}
