//! InMemoryTaskStore - non-durable store for tests and embedding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Fingerprint, SpoolResult, TaskRecord};
use crate::ports::{LoadedPartition, Partition, TaskStore};

/// Clones share the same underlying maps, so a test can keep a handle and
/// inspect what the queue wrote.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    partitions: Arc<Mutex<HashMap<Partition, HashMap<Fingerprint, TaskRecord>>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, partition: Partition, task_id: &Fingerprint) -> Option<TaskRecord> {
        let guard = self.partitions.lock().await;
        guard.get(&partition).and_then(|p| p.get(task_id)).cloned()
    }

    pub async fn len(&self, partition: Partition) -> usize {
        let guard = self.partitions.lock().await;
        guard.get(&partition).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self, partition: Partition) -> SpoolResult<LoadedPartition> {
        let guard = self.partitions.lock().await;
        let records = guard
            .get(&partition)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default();
        Ok(LoadedPartition {
            records,
            skipped: Vec::new(),
        })
    }

    async fn save(&self, partition: Partition, record: &TaskRecord) -> SpoolResult<()> {
        let mut guard = self.partitions.lock().await;
        guard
            .entry(partition)
            .or_default()
            .insert(record.task_id.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, partition: Partition, task_id: &Fingerprint) -> SpoolResult<()> {
        let mut guard = self.partitions.lock().await;
        if let Some(p) = guard.get_mut(&partition) {
            p.remove(task_id);
        }
        Ok(())
    }
}
