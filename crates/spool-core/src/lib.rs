//! spool-core
//!
//! Persistent task queue for a content pipeline: tasks are deduplicated by a
//! content fingerprint, ordered by priority, handed to a remote orchestration
//! webhook when it is reachable and processed by a local handler otherwise.
//!
//! # Modules
//! - **domain**: records, fingerprints, statuses, outcomes, errors
//! - **ports**: seams (TaskStore, RemoteDispatcher, Clock)
//! - **impls**: file and in-memory stores, HTTP dispatcher, command handler
//! - **queue**: QueueManager, pending ordering, dispatch retry, status views
//! - **runtime**: handler registry and local execution
//! - **typed**: typed task API (Task, Handler, RenderTask)
//! - **intake**: project backend polling and completion reports
//! - **config**: `SPOOL_*` environment configuration

pub mod config;
pub mod domain;
pub mod impls;
pub mod intake;
pub mod ports;
pub mod queue;
pub mod runtime;
pub mod typed;

pub use config::SpoolConfig;
pub use domain::{Fingerprint, SpoolError, SpoolResult, TaskRecord, TaskStatus};
pub use queue::{QueueBuilder, QueueManager, QueueOptions};
