//! Queue: the persistent task queue and its processing pass.

mod builder;
mod manager;
mod pending;
mod retry;
mod status;

pub use builder::QueueBuilder;
pub use manager::{QueueManager, QueueOptions};
pub use pending::PendingQueue;
pub use retry::{RetryExhausted, RetryPolicy, retry_async};
pub use status::{PassSummary, QueueStatus};
