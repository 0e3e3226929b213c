use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle state of a persisted task record.
///
/// Stored as a small integer. A record is created `Running`, moves to
/// `Paused` only through a forced pause, and ends in `Finished` — normal
/// completion, failure and the deferred forced transition all land there.
/// `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i16)]
pub enum TaskStatus {
    Running = 1,
    Paused = 2,
    Finished = 3,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Paused => write!(f, "paused"),
            TaskStatus::Finished => write!(f, "finished"),
        }
    }
}

/// What kind of pipeline operation a task tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i16)]
pub enum TaskKind {
    /// Fetch a remote resource to local storage.
    Download = 1,
    /// Upload local media to the cloud drive.
    UploadToDrive = 2,
    /// Anything that does not fit the other kinds.
    Other = 3,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Download => write!(f, "download"),
            TaskKind::UploadToDrive => write!(f, "upload-to-drive"),
            TaskKind::Other => write!(f, "other"),
        }
    }
}

/// One durable task record.
///
/// The store is the source of truth; in-process snapshots of this struct go
/// stale whenever another actor touches the record.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: TaskKind,
    /// Dedupe key within `(kind, owner_id)`: at most one `Running` record may
    /// share it.
    pub unique_id: String,
    pub desc: String,
    pub status: TaskStatus,
    pub percent: f32,
    /// Log file name relative to the logs directory, fixed at creation.
    pub log_path: Option<String>,
    pub error: Option<String>,
    /// Set by a pause request; observed by the task's stop poll.
    pub need_stop: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot handed to callers inspecting a task, optionally with its log
/// lines read back from disk.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskProfile {
    pub id: Uuid,
    pub status: TaskStatus,
    pub desc: String,
    pub percent: f32,
    pub lines: Vec<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
