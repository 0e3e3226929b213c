use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use porter_model::TaskKind;
use tracing::info;
use uuid::Uuid;

use super::controller::Task;
use super::store::{NewTask, TaskStore};
use crate::{PipelineError, Result};

/// Everything needed to create a task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub owner_id: Uuid,
    pub kind: TaskKind,
    pub unique_id: String,
    pub desc: String,
}

/// Creates and caches task handles over a shared store.
///
/// One handle per task id for as long as the registry lives; the registry is
/// owned by whoever drives tasks (e.g. server state), so dropping it drops
/// the cached handles and their watchers with it.
pub struct TaskRegistry {
    store: Arc<dyn TaskStore>,
    logs_dir: PathBuf,
    cached: tokio::sync::RwLock<HashMap<Uuid, Arc<Task>>>,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("TaskRegistry");
        debug.field("logs_dir", &self.logs_dir);
        match self.cached.try_read() {
            Ok(cached) => debug.field("cached", &cached.len()),
            Err(_) => debug.field("cached", &"<locked>"),
        };
        debug.finish()
    }
}

impl TaskRegistry {
    pub fn new(store: Arc<dyn TaskStore>, logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            logs_dir: logs_dir.into(),
            cached: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Create a task in `Running` status and return its handle.
    ///
    /// Fails with `Conflict` while a `Running` record shares the
    /// `(kind, unique_id, owner)` key. The check and the insert are separate
    /// store calls, so two concurrent creates can both pass the check; the
    /// Postgres store backs the invariant with a partial unique index.
    pub async fn create(&self, spec: TaskSpec) -> Result<Arc<Task>> {
        if let Some(existing) = self
            .store
            .find_active(spec.kind, &spec.unique_id, spec.owner_id)
            .await?
        {
            return Err(PipelineError::Conflict(format!(
                "task {} is already running for this target",
                existing.id
            )));
        }

        tokio::fs::create_dir_all(&self.logs_dir).await?;
        let log_path = format!(
            "{}-{}.txt",
            Utc::now().format("%Y%m%d"),
            Uuid::new_v4().simple()
        );
        let record = self
            .store
            .insert(NewTask {
                owner_id: spec.owner_id,
                kind: spec.kind,
                unique_id: spec.unique_id,
                desc: spec.desc,
                log_path: Some(log_path),
            })
            .await?;
        info!("created {} task {}", record.kind, record.id);

        let task = Task::from_record(record, self.store.clone(), &self.logs_dir);
        self.cached.write().await.insert(task.id(), task.clone());
        Ok(task)
    }

    /// Cached handle, or a fresh one loaded from the store.
    pub async fn get(&self, id: Uuid, owner_id: Uuid) -> Result<Arc<Task>> {
        if let Some(task) = self.cached.read().await.get(&id).cloned() {
            return Ok(task);
        }
        let record = self
            .store
            .find(id, owner_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("no task record for {id}")))?;
        let mut cached = self.cached.write().await;
        let task = cached
            .entry(id)
            .or_insert_with(|| Task::from_record(record, self.store.clone(), &self.logs_dir))
            .clone();
        Ok(task)
    }

    /// Drop the cached handle for a task. Returns whether one was cached.
    pub async fn evict(&self, id: Uuid) -> bool {
        self.cached.write().await.remove(&id).is_some()
    }

    pub async fn cached_len(&self) -> usize {
        self.cached.read().await.len()
    }
}
