//! File-backed invocation backlog: `<root>/<YYYY-MM-DD>/<invocation-id>.json`.

use agentrelay_core::error::StoreError;
use agentrelay_core::invocation::{InvocationStatus, ScheduledInvocation};
use agentrelay_core::partition::PartitionKey;
use agentrelay_core::store::InvocationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::fs_util;

pub struct FileInvocationStore {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileInvocationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: PartitionKey, id: &str) -> PathBuf {
        fs_util::record_path(&self.root.join(key.to_string()), id)
    }
}

#[async_trait]
impl InvocationStore for FileInvocationStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn insert(&self, invocation: &ScheduledInvocation) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_path(invocation.partition(), &invocation.id);
        fs_util::create_json(&path, invocation).await
    }

    async fn get(
        &self,
        key: PartitionKey,
        id: &str,
    ) -> Result<Option<ScheduledInvocation>, StoreError> {
        fs_util::read_json(&self.record_path(key, id)).await
    }

    async fn list(&self, key: PartitionKey) -> Result<Vec<ScheduledInvocation>, StoreError> {
        Ok(fs_util::read_partition(&self.root.join(key.to_string())).await)
    }

    async fn transition(
        &self,
        key: PartitionKey,
        id: &str,
        to: InvocationStatus,
        at: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<ScheduledInvocation, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_path(key, id);
        let mut invocation: ScheduledInvocation = fs_util::read_json(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let from = invocation.status;
        invocation.transition(to, at, error)?;
        fs_util::replace_json(&path, &invocation).await?;
        debug!(invocation_id = %id, %from, %to, "Invocation transitioned");
        Ok(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrelay_core::event::Payload;
    use agentrelay_core::invocation::Priority;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn pending(agent: &str, priority: Priority) -> ScheduledInvocation {
        ScheduledInvocation::pending(agent, Payload::new(), priority, Utc::now())
    }

    #[tokio::test]
    async fn insert_get_list() {
        let tmp = TempDir::new().unwrap();
        let store = FileInvocationStore::new(tmp.path());
        let inv = pending("reach-3", Priority::High);
        store.insert(&inv).await.unwrap();

        let got = store.get(inv.partition(), &inv.id).await.unwrap().unwrap();
        assert_eq!(got, inv);
        assert_eq!(store.list(inv.partition()).await.unwrap().len(), 1);
        assert!(store.get(inv.partition(), "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = FileInvocationStore::new(tmp.path());
        let inv = pending("reach-3", Priority::Normal);
        store.insert(&inv).await.unwrap();
        assert!(matches!(store.insert(&inv).await, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn transitions_persist_and_leave_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = FileInvocationStore::new(tmp.path());
        let inv = pending("ghost-9", Priority::Normal);
        store.insert(&inv).await.unwrap();

        let key = inv.partition();
        store
            .transition(key, &inv.id, InvocationStatus::Running, Utc::now(), None)
            .await
            .unwrap();
        let done = store
            .transition(key, &inv.id, InvocationStatus::Done, Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(done.status, InvocationStatus::Done);
        assert!(done.started_at.is_some() && done.finished_at.is_some());

        let reread = store.get(key, &inv.id).await.unwrap().unwrap();
        assert_eq!(reread.status, InvocationStatus::Done);

        let names: Vec<String> = std::fs::read_dir(tmp.path().join(key.to_string()))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = FileInvocationStore::new(tmp.path());
        let inv = pending("intel-9", Priority::Urgent);
        store.insert(&inv).await.unwrap();

        let err = store
            .transition(inv.partition(), &inv.id, InvocationStatus::Done, Utc::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let unchanged = store.get(inv.partition(), &inv.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, InvocationStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_invocation_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = FileInvocationStore::new(tmp.path());
        let err = store
            .transition(
                PartitionKey::today(),
                "schedule-0-deadbeef",
                InvocationStatus::Running,
                Utc::now(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn racing_transitions_only_one_wins() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(FileInvocationStore::new(tmp.path()));
        let inv = pending("health-5", Priority::Urgent);
        store.insert(&inv).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let id = inv.id.clone();
                let key = inv.partition();
                tokio::spawn(async move {
                    store
                        .transition(key, &id, InvocationStatus::Running, Utc::now(), None)
                        .await
                        .is_ok()
                })
            })
            .collect();

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
