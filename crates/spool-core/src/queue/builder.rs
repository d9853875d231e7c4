//! QueueBuilder - wiring for a `QueueManager`.
//!
//! Checked at `open()`:
//! - every kind passed to `expect_kinds()` has a handler registered
//!   (a fallback handler does not count)

use std::sync::Arc;

use crate::domain::{SpoolError, SpoolResult, TaskKind};
use crate::impls::DisabledDispatcher;
use crate::ports::{Clock, RemoteDispatcher, SystemClock, TaskStore};
use crate::runtime::{HandlerRegistry, Runtime};

use super::manager::{QueueManager, QueueOptions};

/// ```ignore
/// let queue = QueueBuilder::new(Arc::new(FileTaskStore::open("queue")?))
///     .dispatcher(Arc::new(HttpDispatcher::new(url, probe, send)?))
///     .registry(registry)
///     .expect_kinds(&["render"])
///     .open()
///     .await?;
/// ```
pub struct QueueBuilder {
    store: Arc<dyn TaskStore>,
    dispatcher: Arc<dyn RemoteDispatcher>,
    registry: HandlerRegistry,
    clock: Arc<dyn Clock>,
    options: QueueOptions,
    expected_kinds: Vec<TaskKind>,
}

impl QueueBuilder {
    /// Defaults: no remote endpoint, empty registry, system clock.
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            dispatcher: Arc::new(DisabledDispatcher),
            registry: HandlerRegistry::new(),
            clock: Arc::new(SystemClock),
            options: QueueOptions::default(),
            expected_kinds: Vec::new(),
        }
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn RemoteDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(mut self, options: QueueOptions) -> Self {
        self.options = options;
        self
    }

    pub fn expect_kinds(mut self, kinds: &[&str]) -> Self {
        self.expected_kinds = kinds.iter().map(|k| TaskKind::new(*k)).collect();
        self
    }

    pub async fn open(self) -> SpoolResult<QueueManager> {
        let registered = self.registry.kinds();
        let missing: Vec<String> = self
            .expected_kinds
            .iter()
            .filter(|k| !registered.contains(k))
            .map(|k| k.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SpoolError::Config(format!(
                "no handler registered for task kind(s): {}",
                missing.join(", ")
            )));
        }

        QueueManager::open(
            self.store,
            self.dispatcher,
            Runtime::new(Arc::new(self.registry)),
            self.clock,
            self.options,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Outcome, TaskEnvelope};
    use crate::impls::InMemoryTaskStore;
    use crate::runtime::TaskHandler;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl TaskHandler for Noop {
        async fn handle(&self, _envelope: &TaskEnvelope) -> Result<Outcome, SpoolError> {
            Ok(Outcome::success())
        }
    }

    #[tokio::test]
    async fn opens_when_expected_kinds_are_registered() {
        let mut registry = HandlerRegistry::new();
        registry.register(TaskKind::new("render"), Arc::new(Noop)).unwrap();

        let queue = QueueBuilder::new(Arc::new(InMemoryTaskStore::new()))
            .registry(registry)
            .expect_kinds(&["render"])
            .open()
            .await
            .unwrap();

        assert_eq!(queue.status().pending_count, 0);
        assert!(!queue.remote_online());
    }

    #[tokio::test]
    async fn missing_kind_fails_fast() {
        let mut registry = HandlerRegistry::new();
        registry.set_fallback(Arc::new(Noop));

        let err = QueueBuilder::new(Arc::new(InMemoryTaskStore::new()))
            .registry(registry)
            .expect_kinds(&["render", "upload"])
            .open()
            .await
            .err()
            .unwrap();

        match err {
            SpoolError::Config(msg) => {
                assert!(msg.contains("render"));
                assert!(msg.contains("upload"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
