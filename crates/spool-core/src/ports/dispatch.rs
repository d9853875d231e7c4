//! RemoteDispatcher port - the orchestration endpoint tasks can be handed to.
//!
//! Implementations:
//! - `HttpDispatcher`: webhook over HTTP.
//! - `DisabledDispatcher`: no endpoint configured; always offline.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TaskRecord;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no remote endpoint configured")]
    NotConfigured,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("remote endpoint returned status {0}")]
    UnexpectedStatus(u16),
}

impl DispatchError {
    /// Transport failures and non-200 answers are worth another try; a
    /// missing endpoint is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::NotConfigured)
    }
}

#[async_trait]
pub trait RemoteDispatcher: Send + Sync {
    /// Bounded-time liveness check. Never errors: unreachable means `false`.
    async fn probe(&self) -> bool;

    /// One delivery attempt of the full record. Retries are the caller's job.
    async fn dispatch(&self, record: &TaskRecord) -> Result<(), DispatchError>;
}
