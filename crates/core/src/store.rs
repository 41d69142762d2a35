//! Storage traits: durable, day-partitioned records.
//!
//! Read paths favor availability: a missing partition is an empty partition,
//! and a corrupt record is skipped instead of hiding its neighbours.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;
use crate::event::{Event, Payload};
use crate::invocation::{InvocationStatus, ScheduledInvocation};
use crate::partition::PartitionKey;
use crate::run::{AnalyticsRecord, FailureRecord};

/// Append-only event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// A short name for this backend (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Stamp, persist, and return a new event.
    ///
    /// Concurrent appends never overwrite each other.
    async fn append(&self, event_type: &str, payload: Payload) -> Result<Event, StoreError>;

    /// All events of one partition, in no particular order.
    async fn list_partition(&self, key: PartitionKey) -> Vec<Event>;

    /// Events with `timestamp` in `[now - since, now]`, newest first.
    async fn query(&self, since: Duration) -> Vec<Event> {
        let now = Utc::now();
        let cutoff = now - since;
        let mut events = Vec::new();
        for key in PartitionKey::covering(cutoff, now) {
            events.extend(
                self.list_partition(key)
                    .await
                    .into_iter()
                    .filter(|e| e.timestamp >= cutoff && e.timestamp <= now),
            );
        }
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events
    }
}

/// Backlog of scheduled invocations.
#[async_trait]
pub trait InvocationStore: Send + Sync {
    fn name(&self) -> &str;

    /// Persist a new invocation in its partition.
    async fn insert(&self, invocation: &ScheduledInvocation) -> Result<(), StoreError>;

    async fn get(
        &self,
        key: PartitionKey,
        id: &str,
    ) -> Result<Option<ScheduledInvocation>, StoreError>;

    /// Every readable invocation of a partition; a missing partition is empty.
    async fn list(&self, key: PartitionKey) -> Result<Vec<ScheduledInvocation>, StoreError>;

    /// Move one invocation along its state machine and persist it.
    ///
    /// Implementations serialize transitions so concurrent updates to the
    /// same record are never lost.
    async fn transition(
        &self,
        key: PartitionKey,
        id: &str,
        to: InvocationStatus,
        at: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<ScheduledInvocation, StoreError>;
}

/// Analytics and failure records written after each run.
#[async_trait]
pub trait RunRecordStore: Send + Sync {
    fn name(&self) -> &str;

    async fn save_analytics(&self, record: &AnalyticsRecord) -> Result<String, StoreError>;

    async fn save_failure(&self, record: &FailureRecord) -> Result<String, StoreError>;

    async fn list_analytics(&self, key: PartitionKey) -> Vec<AnalyticsRecord>;

    async fn list_failures(&self, key: PartitionKey) -> Vec<FailureRecord>;
}
