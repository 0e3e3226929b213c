//! # Porter Core
//!
//! Core library for the Porter media pipeline. Two halves:
//!
//! - [`upload`]: upload preparation — a deterministic content fingerprint,
//!   a proof-of-possession code and a multipart plan, composed into the
//!   immutable descriptor the remote drive consumes before any bytes move —
//!   plus the pipeline driver that pushes local media through a
//!   [`upload::DriveClient`].
//! - [`task`]: the task lifecycle controller — durable task records,
//!   throttled log/progress persistence and cooperative, polling-based
//!   cancellation for long-running jobs.
//!
//! All I/O is async on tokio; there is no parallel chunk fan-out. Tasks
//! coexist as independent timer-driven state machines polling the shared
//! store.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod error;
pub mod task;
pub mod upload;

pub use error::{PipelineError, Result};
pub use task::{
    Journal, MemoryTaskStore, NewTask, Periodic, PostgresTaskStore, Task, TaskPatch,
    TaskRegistry, TaskSpec, TaskStore, TaskUpdate, Throttle, Tick,
};
pub use upload::{
    DriveClient, MediaUploader, PrepareOptions, RemoteFile, UploadOutcome, UploadParams,
    UploadSource, prepare, plan_parts,
};
