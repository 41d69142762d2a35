//! Storage backends for AgentRelay.
//!
//! - File backends write one JSON document per record under
//!   `<data_dir>/<kind>/<YYYY-MM-DD>/`, so concurrent writers never
//!   rewrite a shared file and a corrupt record only hides itself.
//! - In-memory backends implement the same traits for tests and
//!   ephemeral runs.

mod fs_util;

pub mod file_events;
pub mod file_invocations;
pub mod file_runs;
pub mod in_memory;

pub use file_events::FileEventStore;
pub use file_invocations::FileInvocationStore;
pub use file_runs::FileRunRecordStore;
pub use in_memory::{InMemoryEventStore, InMemoryInvocationStore, InMemoryRunRecordStore};

use std::path::Path;
use std::sync::Arc;

use agentrelay_core::EventBus;

/// The three file stores rooted at one data directory.
pub struct FileStores {
    pub events: Arc<FileEventStore>,
    pub invocations: Arc<FileInvocationStore>,
    pub runs: Arc<FileRunRecordStore>,
}

impl FileStores {
    /// Open `events/`, `scheduled/`, `analytics/` and `failures/` under `data_dir`.
    pub fn open(data_dir: &Path, bus: Arc<EventBus>) -> Self {
        Self {
            events: Arc::new(FileEventStore::new(data_dir.join("events")).with_bus(bus)),
            invocations: Arc::new(FileInvocationStore::new(data_dir.join("scheduled"))),
            runs: Arc::new(FileRunRecordStore::new(data_dir)),
        }
    }
}
