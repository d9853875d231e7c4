//! TaskStore port - durable record storage.
//!
//! A store holds one record per task, keyed by fingerprint, in one of two
//! partitions. The queue manager is the only writer; the store does not
//! order records or interpret status.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{Fingerprint, SpoolResult, TaskRecord};

/// Which collection a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Pending,
    Processed,
}

impl Partition {
    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Pending => "pending",
            Partition::Processed => "processed",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of loading one partition.
///
/// Unreadable records are reported separately so one corrupt file never
/// aborts the load of the others.
#[derive(Debug, Default)]
pub struct LoadedPartition {
    pub records: Vec<TaskRecord>,
    pub skipped: Vec<String>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Read every record of a partition (in no particular order).
    async fn load(&self, partition: Partition) -> SpoolResult<LoadedPartition>;

    /// Create or replace the record in `partition`.
    async fn save(&self, partition: Partition, record: &TaskRecord) -> SpoolResult<()>;

    /// Delete the record from `partition`. Missing records are not an error.
    async fn remove(&self, partition: Partition, task_id: &Fingerprint) -> SpoolResult<()>;
}
