//! Task lifecycle control.
//!
//! A task is a durable, trackable handle for one long-running pipeline
//! operation. The store is the source of truth for status and stop
//! requests; the in-process [`Task`] handle buffers journal lines, throttles
//! log/progress persistence and polls the store so a pause request becomes
//! visible to running work — cancellation is cooperative only, there is no
//! preemption.

pub mod controller;
pub mod journal;
pub mod memory;
pub mod postgres;
pub mod registry;
pub mod schedule;
pub mod store;
pub mod throttle;

pub use controller::{Task, TaskUpdate};
pub use journal::Journal;
pub use memory::MemoryTaskStore;
pub use postgres::PostgresTaskStore;
pub use registry::{TaskRegistry, TaskSpec};
pub use schedule::{Periodic, Tick};
pub use store::{NewTask, TaskPatch, TaskStore};
pub use throttle::Throttle;
