//! In-memory stores for tests and `--dry-run`-style embedding.

use agentrelay_core::error::StoreError;
use agentrelay_core::event::{Event, EventBus, Payload, record_id};
use agentrelay_core::invocation::{InvocationStatus, ScheduledInvocation};
use agentrelay_core::partition::PartitionKey;
use agentrelay_core::run::{AnalyticsRecord, FailureRecord};
use agentrelay_core::store::{EventStore, InvocationStore, RunRecordStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<PartitionKey, Vec<Event>>>,
    bus: Option<Arc<EventBus>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Insert an already-stamped event (used to seed historical data).
    pub async fn insert(&self, event: Event) {
        self.events
            .write()
            .await
            .entry(event.partition())
            .or_default()
            .push(event);
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, event_type: &str, payload: Payload) -> Result<Event, StoreError> {
        let event = Event::new(event_type, payload);
        self.insert(event.clone()).await;
        if let Some(bus) = &self.bus {
            bus.publish(event.clone());
        }
        Ok(event)
    }

    async fn list_partition(&self, key: PartitionKey) -> Vec<Event> {
        self.events
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct InMemoryInvocationStore {
    invocations: Mutex<HashMap<PartitionKey, HashMap<String, ScheduledInvocation>>>,
}

impl InMemoryInvocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvocationStore for InMemoryInvocationStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert(&self, invocation: &ScheduledInvocation) -> Result<(), StoreError> {
        let mut map = self.invocations.lock().await;
        let partition = map.entry(invocation.partition()).or_default();
        if partition.contains_key(&invocation.id) {
            return Err(StoreError::Io(format!(
                "invocation {} already exists",
                invocation.id
            )));
        }
        partition.insert(invocation.id.clone(), invocation.clone());
        Ok(())
    }

    async fn get(
        &self,
        key: PartitionKey,
        id: &str,
    ) -> Result<Option<ScheduledInvocation>, StoreError> {
        Ok(self
            .invocations
            .lock()
            .await
            .get(&key)
            .and_then(|p| p.get(id))
            .cloned())
    }

    async fn list(&self, key: PartitionKey) -> Result<Vec<ScheduledInvocation>, StoreError> {
        Ok(self
            .invocations
            .lock()
            .await
            .get(&key)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn transition(
        &self,
        key: PartitionKey,
        id: &str,
        to: InvocationStatus,
        at: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<ScheduledInvocation, StoreError> {
        let mut map = self.invocations.lock().await;
        let invocation = map
            .get_mut(&key)
            .and_then(|p| p.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        invocation.transition(to, at, error)?;
        Ok(invocation.clone())
    }
}

#[derive(Default)]
pub struct InMemoryRunRecordStore {
    analytics: RwLock<Vec<AnalyticsRecord>>,
    failures: RwLock<Vec<FailureRecord>>,
}

impl InMemoryRunRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunRecordStore for InMemoryRunRecordStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn save_analytics(&self, record: &AnalyticsRecord) -> Result<String, StoreError> {
        self.analytics.write().await.push(record.clone());
        Ok(record_id(&record.agent_id, &record.timestamp))
    }

    async fn save_failure(&self, record: &FailureRecord) -> Result<String, StoreError> {
        self.failures.write().await.push(record.clone());
        Ok(record_id(&record.agent_id, &record.timestamp))
    }

    async fn list_analytics(&self, key: PartitionKey) -> Vec<AnalyticsRecord> {
        self.analytics
            .read()
            .await
            .iter()
            .filter(|r| PartitionKey::of(&r.timestamp) == key)
            .cloned()
            .collect()
    }

    async fn list_failures(&self, key: PartitionKey) -> Vec<FailureRecord> {
        self.failures
            .read()
            .await
            .iter()
            .filter(|r| PartitionKey::of(&r.timestamp) == key)
            .cloned()
            .collect()
    }
}
