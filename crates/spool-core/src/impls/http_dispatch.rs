//! HttpDispatcher - hands tasks to a webhook (e.g. a workflow orchestrator).
//!
//! Contract:
//! - probe: `GET <url>`; any status below 500 means alive.
//! - dispatch: `POST <url>` with the full record as JSON; only 200 is success.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::domain::{SpoolResult, TaskRecord};
use crate::ports::{DispatchError, RemoteDispatcher};

#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    url: String,
    probe_timeout: Duration,
    dispatch_timeout: Duration,
}

impl HttpDispatcher {
    pub fn new(
        url: impl Into<String>,
        probe_timeout: Duration,
        dispatch_timeout: Duration,
    ) -> SpoolResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            url: url.into(),
            probe_timeout,
            dispatch_timeout,
        })
    }
}

#[async_trait]
impl RemoteDispatcher for HttpDispatcher {
    async fn probe(&self) -> bool {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.probe_timeout)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().as_u16() < 500 => {
                let status = resp.status().as_u16();
                info!(url = %self.url, status, "remote endpoint reachable");
                true
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                warn!(url = %self.url, status, "remote endpoint unhealthy");
                false
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "remote endpoint offline");
                false
            }
        }
    }

    async fn dispatch(&self, record: &TaskRecord) -> Result<(), DispatchError> {
        let resp = self
            .client
            .post(&self.url)
            .timeout(self.dispatch_timeout)
            .json(record)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        if resp.status() == StatusCode::OK {
            debug!(task_id = %record.task_id, "task accepted by remote endpoint");
            Ok(())
        } else {
            Err(DispatchError::UnexpectedStatus(resp.status().as_u16()))
        }
    }
}

/// Used when no endpoint is configured: always offline, never dispatches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDispatcher;

#[async_trait]
impl RemoteDispatcher for DisabledDispatcher {
    async fn probe(&self) -> bool {
        debug!("no remote endpoint configured");
        false
    }

    async fn dispatch(&self, _record: &TaskRecord) -> Result<(), DispatchError> {
        Err(DispatchError::NotConfigured)
    }
}
