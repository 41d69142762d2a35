//! Shared helpers for the one-file-per-record layout.

use agentrelay_core::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

/// Turn a record id into a safe file stem. Leading dots are dropped since
/// dot-files are never read back as records.
pub(crate) fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    stem.trim_start_matches('.').to_string()
}

pub(crate) fn record_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.json", file_stem(id)))
}

fn io_err(context: &str, path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{context} {}: {e}", path.display()))
}

/// Write a new record; fails if a record with the same id already exists.
pub(crate) async fn create_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err("Failed to create partition", parent, e))?;
    }
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| io_err("Failed to create record", path, e))?;
    file.write_all(&json)
        .await
        .map_err(|e| io_err("Failed to write record", path, e))?;
    file.flush()
        .await
        .map_err(|e| io_err("Failed to flush record", path, e))?;
    Ok(())
}

/// Replace an existing record atomically (temp file + rename).
pub(crate) async fn replace_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));

    fs::write(&tmp, &json)
        .await
        .map_err(|e| io_err("Failed to write temp record", &tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| io_err("Failed to replace record", path, e))?;
    Ok(())
}

/// Read one record. `Ok(None)` when the file does not exist.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err("Failed to read record", path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
}

/// Read every `*.json` record of a partition directory.
///
/// A missing directory yields an empty list; unreadable or corrupt records
/// are skipped with a warning.
pub(crate) async fn read_partition<T: DeserializeOwned>(dir: &Path) -> Vec<T> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %dir.display(), error = %e, "Failed to read partition");
            }
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Partition listing interrupted");
                break;
            }
        };
        let path = entry.path();
        let is_record = path.extension().is_some_and(|ext| ext == "json")
            && !entry.file_name().to_string_lossy().starts_with('.');
        if !is_record {
            continue;
        }
        match read_json::<T>(&path).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Skipping corrupted record"),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_replaces_path_separators() {
        assert_eq!(file_stem("scout.completed-1-ab"), "scout.completed-1-ab");
        assert_eq!(file_stem("../etc/passwd"), "_etc_passwd");
        assert_eq!(file_stem(".hidden"), "hidden");
    }
}
