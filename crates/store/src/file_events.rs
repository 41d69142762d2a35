//! File-backed event log: `<root>/<YYYY-MM-DD>/<event-id>.json`.

use agentrelay_core::error::StoreError;
use agentrelay_core::event::{Event, EventBus, Payload};
use agentrelay_core::partition::PartitionKey;
use agentrelay_core::store::EventStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::fs_util;

pub struct FileEventStore {
    root: PathBuf,
    bus: Option<Arc<EventBus>>,
}

impl FileEventStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bus: None,
        }
    }

    /// Publish every appended event on `bus` after it is persisted.
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, key: PartitionKey) -> PathBuf {
        self.root.join(key.to_string())
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, event_type: &str, payload: Payload) -> Result<Event, StoreError> {
        let event = Event::new(event_type, payload);
        let path = fs_util::record_path(&self.partition_dir(event.partition()), &event.id);
        fs_util::create_json(&path, &event).await?;
        debug!(event_id = %event.id, event_type = %event.event_type, "Event appended");

        if let Some(bus) = &self.bus {
            bus.publish(event.clone());
        }
        Ok(event)
    }

    async fn list_partition(&self, key: PartitionKey) -> Vec<Event> {
        fs_util::read_partition(&self.partition_dir(key)).await
    }
}
