//! Analytics and failure records under `analytics/<date>/` and `failures/<date>/`.

use agentrelay_core::error::StoreError;
use agentrelay_core::event::record_id;
use agentrelay_core::partition::PartitionKey;
use agentrelay_core::run::{AnalyticsRecord, FailureRecord};
use agentrelay_core::store::RunRecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::fs_util;

pub struct FileRunRecordStore {
    analytics_dir: PathBuf,
    failures_dir: PathBuf,
}

impl FileRunRecordStore {
    /// Records land in `<data_dir>/analytics` and `<data_dir>/failures`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            analytics_dir: data_dir.join("analytics"),
            failures_dir: data_dir.join("failures"),
        }
    }

    async fn write<T: serde::Serialize + Sync>(
        dir: &Path,
        agent_id: &str,
        at: &DateTime<Utc>,
        record: &T,
    ) -> Result<String, StoreError> {
        let id = record_id(agent_id, at);
        let path = fs_util::record_path(&dir.join(PartitionKey::of(at).to_string()), &id);
        fs_util::create_json(&path, record).await?;
        debug!(record_id = %id, path = %path.display(), "Run record written");
        Ok(id)
    }
}

#[async_trait]
impl RunRecordStore for FileRunRecordStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save_analytics(&self, record: &AnalyticsRecord) -> Result<String, StoreError> {
        Self::write(&self.analytics_dir, &record.agent_id, &record.timestamp, record).await
    }

    async fn save_failure(&self, record: &FailureRecord) -> Result<String, StoreError> {
        Self::write(&self.failures_dir, &record.agent_id, &record.timestamp, record).await
    }

    async fn list_analytics(&self, key: PartitionKey) -> Vec<AnalyticsRecord> {
        fs_util::read_partition(&self.analytics_dir.join(key.to_string())).await
    }

    async fn list_failures(&self, key: PartitionKey) -> Vec<FailureRecord> {
        fs_util::read_partition(&self.failures_dir.join(key.to_string())).await
    }
}
