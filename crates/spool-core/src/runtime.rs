use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Outcome, SpoolError, TaskEnvelope, TaskKind};
use crate::typed::{Handler, Task, TypedHandler};

/// Local processing step for a task kind.
///
/// Takes the whole `TaskEnvelope` so the handler can decode parameters as it
/// likes. Any `Err` counts against the task's attempt budget.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, envelope: &TaskEnvelope) -> Result<Outcome, SpoolError>;
}

/// Registry of handlers (kind -> handler).
///
/// Built during initialization (mutable), used during processing
/// (immutable behind an `Arc`).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskKind, Arc<dyn TaskHandler>>,
    fallback: Option<Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a kind. Registering a kind twice is an error.
    pub fn register(
        &mut self,
        kind: TaskKind,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), SpoolError> {
        if self.handlers.contains_key(&kind) {
            return Err(SpoolError::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    /// Register a typed handler under `T::KIND`.
    pub fn register_typed<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), SpoolError> {
        self.register(
            TaskKind::new(T::KIND),
            Arc::new(TypedHandler::<T, H>::new(handler)),
        )
    }

    /// Handler used for kinds without a dedicated registration.
    pub fn set_fallback(&mut self, handler: Arc<dyn TaskHandler>) {
        self.fallback = Some(handler);
    }

    pub fn get(&self, kind: &TaskKind) -> Option<&Arc<dyn TaskHandler>> {
        self.handlers.get(kind).or(self.fallback.as_ref())
    }

    pub fn kinds(&self) -> Vec<&TaskKind> {
        self.handlers.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.fallback.is_none()
    }
}

/// Runtime executes a `TaskEnvelope` by dispatching to a registered handler.
#[derive(Clone)]
pub struct Runtime {
    registry: Arc<HandlerRegistry>,
}

impl Runtime {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Execute one envelope.
    pub async fn execute(&self, envelope: &TaskEnvelope) -> Result<Outcome, SpoolError> {
        let kind = envelope.kind();
        let handler = self
            .registry
            .get(kind)
            .ok_or_else(|| SpoolError::HandlerNotFound(kind.clone()))?;

        debug!(task_id = %envelope.task_id(), kind = %kind, "executing local handler");
        handler.handle(envelope).await
    }
}
