//! Pending collection: priority-ordered, insertion order breaks ties.

use crate::domain::{Fingerprint, TaskRecord};

/// Pending tasks, head first.
///
/// Invariant: `records` is sorted by priority descending; records of equal
/// priority keep the order in which they were pushed.
#[derive(Debug, Default)]
pub struct PendingQueue {
    records: Vec<TaskRecord>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert behind every record of the same or higher priority.
    pub fn push(&mut self, record: TaskRecord) {
        let idx = self
            .records
            .partition_point(|r| r.priority >= record.priority);
        self.records.insert(idx, record);
    }

    pub fn contains(&self, task_id: &Fingerprint) -> bool {
        self.records.iter().any(|r| &r.task_id == task_id)
    }

    pub fn head(&self) -> Option<&TaskRecord> {
        self.records.first()
    }

    pub fn head_mut(&mut self) -> Option<&mut TaskRecord> {
        self.records.first_mut()
    }

    pub fn pop_head(&mut self) -> Option<TaskRecord> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.records.remove(0))
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter()
    }

    /// The first `n` records, head first.
    pub fn preview(&self, n: usize) -> Vec<TaskRecord> {
        self.records.iter().take(n).cloned().collect()
    }
}
