//! Read-only views of the queue.

use serde::{Deserialize, Serialize};

use crate::domain::TaskRecord;

/// Snapshot returned by `QueueManager::status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending_count: usize,
    pub processed_count: usize,
    pub remote_online: bool,
    /// Highest-priority pending tasks, head first (bounded).
    pub pending_preview: Vec<TaskRecord>,
}

/// Counts for one processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Tasks that reached `sent_remote` or `completed_local`.
    pub processed: usize,
    /// Tasks that reached `failed`.
    pub failed: usize,
    /// Tasks still pending when the pass ended.
    pub pending: usize,
}
