//! Ports - traits at the external seams of the queue.
//!
//! - `TaskStore`: where records live (filesystem, memory).
//! - `RemoteDispatcher`: the remote endpoint tasks can be handed to.
//! - `Clock`: time source for timestamps and pruning.

pub mod clock;
pub mod dispatch;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::dispatch::{DispatchError, RemoteDispatcher};
pub use self::task_store::{LoadedPartition, Partition, TaskStore};
