use async_trait::async_trait;
use porter_model::{TaskKind, TaskRecord, TaskStatus};
use uuid::Uuid;

use crate::Result;

/// Fields required to insert a new task record. Records always start
/// `Running` with zero progress.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub owner_id: Uuid,
    pub kind: TaskKind,
    pub unique_id: String,
    pub desc: String,
    pub log_path: Option<String>,
}

/// Partial update applied to a task record; `None` fields are left
/// untouched. Every applied patch bumps `updated_at`.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub percent: Option<f32>,
    pub desc: Option<String>,
    pub error: Option<String>,
    pub need_stop: Option<bool>,
}

/// Durable store for task records.
///
/// The store is the only shared mutable resource between tasks and between
/// processes; controllers re-read records rather than trusting snapshots
/// whenever another actor may have written.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new `Running` record and return it.
    async fn insert(&self, task: NewTask) -> Result<TaskRecord>;

    /// Load a record by id, scoped to its owner.
    async fn find(&self, id: Uuid, owner_id: Uuid) -> Result<Option<TaskRecord>>;

    /// Find a `Running` record with the same dedupe key, if any.
    async fn find_active(
        &self,
        kind: TaskKind,
        unique_id: &str,
        owner_id: Uuid,
    ) -> Result<Option<TaskRecord>>;

    /// Apply a partial update. Updating a missing record is a no-op.
    async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<()>;

    /// Most recently created records for an owner, newest first.
    async fn list_recent(&self, owner_id: Uuid, limit: usize) -> Result<Vec<TaskRecord>>;
}
