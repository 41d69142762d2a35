//! Events: immutable records of something that happened.
//!
//! An agent run finishing, a blog post going live, a competitor changing
//! prices: each is appended to the event store and then checked against
//! the trigger rules. In-process observers can also follow appends through
//! the broadcast [`EventBus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::partition::PartitionKey;

/// Free-form event payload.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A stored event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique within its day partition
    pub id: String,

    /// Dotted event type, e.g. `scout.completed`
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub payload: Payload,

    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Build a new event stamped with the current instant.
    pub fn new(event_type: impl Into<String>, payload: Payload) -> Self {
        let event_type = event_type.into();
        let timestamp = Utc::now();
        Self {
            id: record_id(&event_type, &timestamp),
            event_type,
            payload,
            timestamp,
        }
    }

    /// The day partition this event belongs to.
    pub fn partition(&self) -> PartitionKey {
        PartitionKey::of(&self.timestamp)
    }

    /// The conventional completion event type for an agent.
    pub fn completion_type(agent_id: &str) -> String {
        format!("{agent_id}.completed")
    }
}

/// Derive a record id from a prefix and its creation instant.
///
/// The random suffix keeps ids unique under concurrent appends within the
/// same millisecond without any shared counter.
pub fn record_id(prefix: &str, at: &DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}-{}", at.timestamp_millis(), &suffix[..8])
}

/// A broadcast-based bus carrying every appended event.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Completion of
/// detached (urgent) runs is only observable here or in the store.
pub struct EventBus {
    sender: broadcast::Sender<Arc<Event>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: Event) {
        let event_type = event.event_type.clone();
        if let Ok(receivers) = self.sender.send(Arc::new(event)) {
            tracing::trace!(%event_type, receivers, "Event published");
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
