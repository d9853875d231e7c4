//! Handler trait - typed handlers and their adapter to `TaskHandler`.
//!
//! - `Handler<T>` receives an already-decoded `T`.
//! - `TypedHandler<T, H>` erases the type so it can sit in the
//!   `HandlerRegistry` next to untyped handlers.

use std::marker::PhantomData;

use async_trait::async_trait;

use super::task::Task;
use crate::domain::{Fingerprint, Outcome, SpoolError, TaskEnvelope};
use crate::runtime::TaskHandler;

#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task_id: &Fingerprint, task: T) -> Result<Outcome, SpoolError>;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> TaskHandler for TypedHandler<T, H> {
    async fn handle(&self, envelope: &TaskEnvelope) -> Result<Outcome, SpoolError> {
        // A payload that doesn't decode is a handler failure, not a storage one.
        let task: T = serde_json::from_value(envelope.params().clone()).map_err(|e| {
            SpoolError::handler(format!("cannot decode {} params: {e}", T::KIND))
        })?;
        self.handler.handle(envelope.task_id(), task).await
    }
}
