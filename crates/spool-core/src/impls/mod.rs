//! Impls - implementations of the ports and of local handlers.
//!
//! - **FileTaskStore**: durable store, one JSON file per record
//! - **InMemoryTaskStore**: non-durable store for tests
//! - **HttpDispatcher** / **DisabledDispatcher**: remote endpoint
//! - **CommandHandler**: local handler running an external program

pub mod command_handler;
pub mod fs_store;
pub mod http_dispatch;
pub mod inmem_store;

pub use self::command_handler::CommandHandler;
pub use self::fs_store::FileTaskStore;
pub use self::http_dispatch::{DisabledDispatcher, HttpDispatcher};
pub use self::inmem_store::InMemoryTaskStore;
