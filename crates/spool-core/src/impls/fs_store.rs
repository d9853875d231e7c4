//! FileTaskStore - one JSON file per record, one directory per partition.
//!
//! Layout:
//! - `<pending_dir>/<fingerprint>.json`
//! - `<processed_dir>/<fingerprint>.json`
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a
//! crash never leaves a half-written record under its real name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::{Fingerprint, SpoolError, SpoolResult, TaskRecord};
use crate::ports::{LoadedPartition, Partition, TaskStore};

#[derive(Debug, Clone)]
pub struct FileTaskStore {
    pending_dir: PathBuf,
    processed_dir: PathBuf,
}

impl FileTaskStore {
    /// Store with `pending/` and `processed/` under `root`.
    pub async fn open(root: impl AsRef<Path>) -> SpoolResult<Self> {
        let root = root.as_ref();
        Self::with_dirs(root.join("pending"), root.join("processed")).await
    }

    /// Store with explicit partition directories (created if missing).
    pub async fn with_dirs(
        pending_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
    ) -> SpoolResult<Self> {
        let store = Self {
            pending_dir: pending_dir.into(),
            processed_dir: processed_dir.into(),
        };
        for dir in [&store.pending_dir, &store.processed_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| SpoolError::storage(dir, e))?;
        }
        debug!(
            pending = %store.pending_dir.display(),
            processed = %store.processed_dir.display(),
            "file task store ready"
        );
        Ok(store)
    }

    pub fn dir(&self, partition: Partition) -> &Path {
        match partition {
            Partition::Pending => &self.pending_dir,
            Partition::Processed => &self.processed_dir,
        }
    }

    pub fn record_path(&self, partition: Partition, task_id: &Fingerprint) -> PathBuf {
        self.dir(partition).join(format!("{task_id}.json"))
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn load(&self, partition: Partition) -> SpoolResult<LoadedPartition> {
        let dir = self.dir(partition);
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| SpoolError::storage(dir, e))?;

        let mut loaded = LoadedPartition::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SpoolError::storage(dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let bytes = fs::read(&path)
                .await
                .map_err(|e| SpoolError::storage(&path, e))?;

            match serde_json::from_slice::<TaskRecord>(&bytes) {
                Ok(record) => loaded.records.push(record),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping corrupted task file");
                    loaded.skipped.push(path.display().to_string());
                }
            }
        }
        Ok(loaded)
    }

    async fn save(&self, partition: Partition, record: &TaskRecord) -> SpoolResult<()> {
        let path = self.record_path(partition, &record.task_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(record)?;

        fs::write(&tmp, body)
            .await
            .map_err(|e| SpoolError::storage(&tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| SpoolError::storage(&path, e))?;

        debug!(task_id = %record.task_id, file = %path.display(), "task saved");
        Ok(())
    }

    async fn remove(&self, partition: Partition, task_id: &Fingerprint) -> SpoolResult<()> {
        let path = self.record_path(partition, task_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SpoolError::storage(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskKind;
    use chrono::Utc;
    use serde_json::json;

    fn record(topic: &str) -> TaskRecord {
        TaskRecord::new(TaskKind::new("render"), json!({"topic": topic}), 1, Utc::now())
    }

    #[tokio::test]
    async fn save_load_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileTaskStore::open(tmp.path()).await.unwrap();
        let r = record("space");

        store.save(Partition::Pending, &r).await.unwrap();
        assert!(store.record_path(Partition::Pending, &r.task_id).exists());

        let loaded = store.load(Partition::Pending).await.unwrap();
        assert_eq!(loaded.records, vec![r.clone()]);
        assert!(store.load(Partition::Processed).await.unwrap().records.is_empty());

        store.remove(Partition::Pending, &r.task_id).await.unwrap();
        assert!(store.load(Partition::Pending).await.unwrap().records.is_empty());

        // removing twice is fine
        store.remove(Partition::Pending, &r.task_id).await.unwrap();
    }

    #[tokio::test]
    async fn corrupted_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileTaskStore::open(tmp.path()).await.unwrap();
        store.save(Partition::Pending, &record("ok")).await.unwrap();

        std::fs::write(tmp.path().join("pending/broken.json"), b"{ not json").unwrap();
        std::fs::write(tmp.path().join("pending/notes.txt"), b"ignored").unwrap();

        let loaded = store.load(Partition::Pending).await.unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.skipped[0].ends_with("broken.json"));
    }

    #[tokio::test]
    async fn records_are_pretty_printed_json() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileTaskStore::open(tmp.path()).await.unwrap();
        let r = record("space");
        store.save(Partition::Processed, &r).await.unwrap();

        let raw = std::fs::read_to_string(store.record_path(Partition::Processed, &r.task_id))
            .unwrap();
        assert!(raw.contains("\n  \"task_id\""));
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["type"], "render");
    }
}
