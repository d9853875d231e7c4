//! QueueManager - durable, deduplicated, priority-ordered task queue with
//! remote dispatch and local fallback.
//!
//! Design:
//! - The manager is the single mutator of both collections and of every
//!   record in the store. Methods take `&mut self`; there is no internal
//!   locking and no two managers may share a store.
//! - Every state change is written to the store before it becomes visible
//!   in memory, so a storage error leaves memory matching disk.
//! - Moving a task to processed first rewrites its pending record with the
//!   terminal status, then writes the processed record, then deletes the
//!   pending one. An interruption after the first step leaves a terminal
//!   record in the pending partition; `reload` and the next pass finish the
//!   move instead of running the task again.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{Instrument, error, info, info_span, warn};

use super::pending::PendingQueue;
use super::retry::{RetryPolicy, retry_async};
use super::status::{PassSummary, QueueStatus};
use crate::domain::{Fingerprint, SpoolResult, TaskKind, TaskRecord, TaskStatus};
use crate::ports::{Clock, Partition, RemoteDispatcher, TaskStore};
use crate::runtime::Runtime;
use crate::typed::Task;

/// Tunables for a `QueueManager`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueOptions {
    /// Local attempts before a task is marked failed.
    pub max_attempts: u32,
    /// Retry policy for each remote dispatch.
    pub dispatch_retry: RetryPolicy,
    /// How many pending tasks `status` previews.
    pub status_preview: usize,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            dispatch_retry: RetryPolicy::default(),
            status_preview: 5,
        }
    }
}

/// How the head task left the local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalResult {
    Completed,
    Failed,
    RetryLater,
}

pub struct QueueManager {
    store: Arc<dyn TaskStore>,
    dispatcher: Arc<dyn RemoteDispatcher>,
    runtime: Runtime,
    clock: Arc<dyn Clock>,
    options: QueueOptions,

    pending: PendingQueue,
    processed: Vec<TaskRecord>,

    /// Refreshed by the probe at the start of every pass. Not persisted.
    remote_online: bool,
}

impl QueueManager {
    /// Create a manager over `store` and load whatever it already holds.
    pub async fn open(
        store: Arc<dyn TaskStore>,
        dispatcher: Arc<dyn RemoteDispatcher>,
        runtime: Runtime,
        clock: Arc<dyn Clock>,
        options: QueueOptions,
    ) -> SpoolResult<Self> {
        let mut manager = Self {
            store,
            dispatcher,
            runtime,
            clock,
            options,
            pending: PendingQueue::new(),
            processed: Vec::new(),
            remote_online: false,
        };
        manager.reload().await?;
        Ok(manager)
    }

    /// Discard in-memory state and re-read both partitions from the store.
    pub async fn reload(&mut self) -> SpoolResult<()> {
        let pending = self.store.load(Partition::Pending).await?;
        let processed = self.store.load(Partition::Processed).await?;
        let skipped = pending.skipped.len() + processed.skipped.len();

        let mut processed_records = processed.records;
        let mut pending_records = Vec::with_capacity(pending.records.len());

        for record in pending.records {
            if record.status.is_terminal() {
                // residue of an interrupted move: processed may or may not
                // have been written, so write it again and finish the move
                warn!(
                    task_id = %record.task_id,
                    status = %record.status,
                    "completing interrupted move to processed"
                );
                self.store.save(Partition::Processed, &record).await?;
                self.store.remove(Partition::Pending, &record.task_id).await?;
                processed_records.retain(|r| r.task_id != record.task_id);
                processed_records.push(record);
            } else {
                pending_records.push(record);
            }
        }

        // Insertion order is not persisted; creation time stands in for it.
        pending_records.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.task_id.cmp(&b.task_id))
        });
        processed_records.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        self.pending = PendingQueue::new();
        for record in pending_records {
            self.pending.push(record);
        }
        self.processed = processed_records;

        info!(
            pending = self.pending.len(),
            processed = self.processed.len(),
            skipped,
            "loaded tasks"
        );
        Ok(())
    }

    /// Add a task. Identical (kind, params) already pending is a no-op that
    /// returns the existing fingerprint.
    pub async fn enqueue(
        &mut self,
        kind: impl Into<String>,
        params: Value,
        priority: i64,
    ) -> SpoolResult<Fingerprint> {
        let kind = TaskKind::new(kind);
        let task_id = Fingerprint::of(kind.as_str(), &params);

        if self.pending.contains(&task_id) {
            info!(task_id = %task_id, "task already in queue");
            return Ok(task_id);
        }

        let record = TaskRecord::new(kind, params, priority, self.clock.now());
        self.store.save(Partition::Pending, &record).await?;

        info!(task_id = %record.task_id, kind = %record.kind, priority, "task added");
        self.pending.push(record);
        Ok(task_id)
    }

    /// Enqueue a typed task under `T::KIND`.
    pub async fn enqueue_typed<T: Task>(
        &mut self,
        task: &T,
        priority: i64,
    ) -> SpoolResult<Fingerprint> {
        let params = serde_json::to_value(task)?;
        self.enqueue(T::KIND, params, priority).await
    }

    /// Process pending tasks head first until the collection is empty or a
    /// local failure halts the pass.
    ///
    /// Only storage errors are returned; every per-task problem ends up in
    /// the task's status.
    pub async fn process_all(&mut self) -> SpoolResult<PassSummary> {
        self.run_pass().instrument(info_span!("queue_pass")).await
    }

    async fn run_pass(&mut self) -> SpoolResult<PassSummary> {
        let started = Instant::now();
        let mut summary = PassSummary::default();

        self.remote_online = self.dispatcher.probe().await;

        while let Some(head) = self.pending.head() {
            let record = head.clone();

            if record.status.is_terminal() {
                // an earlier move stopped halfway; the work itself is done
                warn!(
                    task_id = %record.task_id,
                    status = %record.status,
                    "resuming move to processed"
                );
                self.complete_move(record).await?;
                continue;
            }

            if self.remote_online {
                if self.dispatch(&record).await {
                    let mut sent = record;
                    sent.mark_sent_remote();
                    self.finish_head(sent).await?;
                    summary.processed += 1;
                    continue;
                }
                // Retries exhausted: treat the endpoint as down for the rest
                // of this pass instead of paying the backoff for every task.
                self.remote_online = false;
            }

            match self.process_local(record).await? {
                LocalResult::Completed => summary.processed += 1,
                LocalResult::Failed => {
                    summary.failed += 1;
                    break;
                }
                LocalResult::RetryLater => break,
            }
        }

        summary.pending = self.pending.len();
        info!(
            processed = summary.processed,
            failed = summary.failed,
            pending = summary.pending,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "queue processing summary"
        );
        Ok(summary)
    }

    /// Remote branch: deliver with retry. `true` when accepted.
    async fn dispatch(&self, record: &TaskRecord) -> bool {
        let dispatcher = &self.dispatcher;
        let result = retry_async(
            &self.options.dispatch_retry,
            "remote dispatch",
            |e: &crate::ports::DispatchError| e.is_retryable(),
            || dispatcher.dispatch(record),
        )
        .await;

        match result {
            Ok(()) => {
                info!(task_id = %record.task_id, "task sent to remote endpoint");
                true
            }
            Err(exhausted) => {
                warn!(
                    task_id = %record.task_id,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "remote dispatch failed, falling back to local processing"
                );
                false
            }
        }
    }

    /// Local branch: one attempt of the local handler for the head task.
    async fn process_local(&mut self, mut record: TaskRecord) -> SpoolResult<LocalResult> {
        record.start_local_attempt();
        self.store.save(Partition::Pending, &record).await?;
        if let Some(head) = self.pending.head_mut() {
            *head = record.clone();
        }

        let envelope = record.envelope();
        match self.runtime.execute(&envelope).await {
            Ok(outcome) => {
                info!(
                    task_id = %record.task_id,
                    attempts = record.attempts,
                    artifact = outcome.file_path().unwrap_or("-"),
                    "task completed locally"
                );
                record.mark_completed_local();
                self.finish_head(record).await?;
                Ok(LocalResult::Completed)
            }
            Err(e) if record.attempts >= self.options.max_attempts => {
                error!(
                    task_id = %record.task_id,
                    attempts = record.attempts,
                    error = %e,
                    "task failed permanently"
                );
                record.mark_failed();
                self.finish_head(record).await?;
                Ok(LocalResult::Failed)
            }
            Err(e) => {
                error!(
                    task_id = %record.task_id,
                    attempts = record.attempts,
                    max_attempts = self.options.max_attempts,
                    error = %e,
                    "error processing task, halting pass"
                );
                Ok(LocalResult::RetryLater)
            }
        }
    }

    /// Move the head task (now terminal) to processed: disk first, then memory.
    ///
    /// Once the terminal status is on disk the in-memory head carries it too,
    /// so a later failure in the move never leads to running the task again.
    async fn finish_head(&mut self, record: TaskRecord) -> SpoolResult<()> {
        debug_assert!(record.status.is_terminal());
        debug_assert_eq!(self.pending.head().map(|h| &h.task_id), Some(&record.task_id));

        self.store.save(Partition::Pending, &record).await?;
        if let Some(head) = self.pending.head_mut() {
            *head = record.clone();
        }
        self.complete_move(record).await
    }

    async fn complete_move(&mut self, record: TaskRecord) -> SpoolResult<()> {
        self.store.save(Partition::Processed, &record).await?;
        self.store.remove(Partition::Pending, &record.task_id).await?;

        self.pending.pop_head();
        self.processed.retain(|r| r.task_id != record.task_id);
        self.processed.push(record);
        Ok(())
    }

    /// Read-only snapshot.
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending_count: self.pending.len(),
            processed_count: self.processed.len(),
            remote_online: self.remote_online,
            pending_preview: self.pending.preview(self.options.status_preview),
        }
    }

    /// Drop processed tasks created more than `max_age_days` ago, records
    /// included. Returns how many were removed.
    pub async fn prune(&mut self, max_age_days: u32) -> SpoolResult<usize> {
        let cutoff = self.clock.now() - chrono::Duration::days(i64::from(max_age_days));
        let expired: Vec<Fingerprint> = self
            .processed
            .iter()
            .filter(|r| r.created_at < cutoff)
            .map(|r| r.task_id.clone())
            .collect();

        for task_id in &expired {
            self.store.remove(Partition::Processed, task_id).await?;
            self.processed.retain(|r| &r.task_id != task_id);
        }

        info!(removed = expired.len(), max_age_days, "cleared old tasks");
        Ok(expired.len())
    }

    pub fn pending(&self) -> impl Iterator<Item = &TaskRecord> {
        self.pending.iter()
    }

    pub fn processed(&self) -> &[TaskRecord] {
        &self.processed
    }

    /// Look a task up, pending first.
    pub fn find(&self, task_id: &Fingerprint) -> Option<&TaskRecord> {
        self.pending
            .iter()
            .find(|r| &r.task_id == task_id)
            .or_else(|| self.processed.iter().rev().find(|r| &r.task_id == task_id))
    }

    pub fn status_of(&self, task_id: &Fingerprint) -> Option<TaskStatus> {
        self.find(task_id).map(|r| r.status)
    }

    pub fn remote_online(&self) -> bool {
        self.remote_online
    }
}
