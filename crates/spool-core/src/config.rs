//! Runtime configuration read from `SPOOL_*` environment variables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::SpoolResult;
use crate::impls::{CommandHandler, DisabledDispatcher, HttpDispatcher};
use crate::ports::RemoteDispatcher;
use crate::queue::{QueueOptions, RetryPolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct SpoolConfig {
    /// Root of the store; holds `pending/` and `processed/`.
    pub queue_dir: PathBuf,
    /// Remote orchestration webhook. `None` disables remote dispatch.
    pub webhook_url: Option<String>,
    pub probe_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub dispatch_attempts: u32,
    pub dispatch_base_delay: Duration,
    /// Local attempts before a task is failed.
    pub max_attempts: u32,
    pub status_preview: usize,
    /// Job backend polled by `spool worker`.
    pub backend_url: Option<String>,
    pub poll_interval: Duration,
    /// Command line run for `render` tasks.
    pub render_command: Option<String>,
    /// Kill the render command after this long. `None` waits forever.
    pub render_timeout: Option<Duration>,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            queue_dir: PathBuf::from("queue"),
            webhook_url: None,
            probe_timeout: Duration::from_secs(5),
            dispatch_timeout: Duration::from_secs(10),
            dispatch_attempts: 3,
            dispatch_base_delay: Duration::from_millis(1000),
            max_attempts: 3,
            status_preview: 5,
            backend_url: None,
            poll_interval: Duration::from_secs(5),
            render_command: None,
            render_timeout: None,
        }
    }
}

impl SpoolConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults;
    /// empty strings count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let num = |key: &str, default: u64| {
            get(key).and_then(|s| s.parse().ok()).unwrap_or(default)
        };
        let d = Self::default();

        Self {
            queue_dir: get("SPOOL_QUEUE_DIR").map(PathBuf::from).unwrap_or(d.queue_dir),
            webhook_url: get("SPOOL_WEBHOOK_URL"),
            probe_timeout: Duration::from_secs(num("SPOOL_PROBE_TIMEOUT_SECS", 5)),
            dispatch_timeout: Duration::from_secs(num("SPOOL_DISPATCH_TIMEOUT_SECS", 10)),
            dispatch_attempts: get("SPOOL_DISPATCH_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.dispatch_attempts),
            dispatch_base_delay: Duration::from_millis(
                num("SPOOL_DISPATCH_BASE_DELAY_MS", 1000),
            ),
            max_attempts: get("SPOOL_MAX_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_attempts),
            status_preview: get("SPOOL_STATUS_PREVIEW")
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.status_preview),
            backend_url: get("SPOOL_BACKEND_URL"),
            poll_interval: Duration::from_secs(num("SPOOL_POLL_INTERVAL_SECS", 5)),
            render_command: get("SPOOL_RENDER_COMMAND"),
            render_timeout: get("SPOOL_RENDER_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    pub fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            max_attempts: self.max_attempts,
            dispatch_retry: RetryPolicy::new(
                self.dispatch_attempts,
                self.dispatch_base_delay,
                2.0,
            ),
            status_preview: self.status_preview,
        }
    }

    /// HTTP dispatcher when a webhook is configured, otherwise one that is
    /// always offline.
    pub fn dispatcher(&self) -> SpoolResult<Arc<dyn RemoteDispatcher>> {
        Ok(match &self.webhook_url {
            Some(url) => Arc::new(HttpDispatcher::new(
                url.clone(),
                self.probe_timeout,
                self.dispatch_timeout,
            )?),
            None => Arc::new(DisabledDispatcher),
        })
    }

    /// The local `render` handler, if a render command is configured.
    pub fn render_handler(&self) -> SpoolResult<Option<CommandHandler>> {
        let Some(command) = &self.render_command else {
            return Ok(None);
        };
        let handler = CommandHandler::from_command_line(command)?;
        Ok(Some(match self.render_timeout {
            Some(timeout) => handler.with_timeout(timeout),
            None => handler,
        }))
    }
}
