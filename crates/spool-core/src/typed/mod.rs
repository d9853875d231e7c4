//! Typed - typed task API.
//!
//! Binds parameter structs to task kinds so a kind string is written once
//! (`Task::KIND`) and handlers receive decoded values.
//!
//! - **Typed surface**: `Task` trait, `Handler<T>` trait
//! - **Erased**: `TypedHandler<T, H>` implements `runtime::TaskHandler`

pub mod handler;
pub mod task;

pub use self::handler::{Handler, TypedHandler};
pub use self::task::{RenderTask, Task};
