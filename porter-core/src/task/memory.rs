use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use porter_model::{TaskKind, TaskRecord, TaskStatus};
use uuid::Uuid;

use super::store::{NewTask, TaskPatch, TaskStore};
use crate::Result;

/// In-memory [`TaskStore`] for tests and embedded callers.
#[derive(Default)]
pub struct MemoryTaskStore {
    records: tokio::sync::Mutex<HashMap<Uuid, TaskRecord>>,
}

impl std::fmt::Debug for MemoryTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("MemoryTaskStore");
        match self.records.try_lock() {
            Ok(records) => debug.field("records", &records.len()),
            Err(_) => debug.field("records", &"<locked>"),
        };
        debug.finish()
    }
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, task: NewTask) -> Result<TaskRecord> {
        let now = Utc::now();
        let record = TaskRecord {
            id: Uuid::new_v4(),
            owner_id: task.owner_id,
            kind: task.kind,
            unique_id: task.unique_id,
            desc: task.desc,
            status: TaskStatus::Running,
            percent: 0.0,
            log_path: task.log_path,
            error: None,
            need_stop: false,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find(&self, id: Uuid, owner_id: Uuid) -> Result<Option<TaskRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .get(&id)
            .filter(|record| record.owner_id == owner_id)
            .cloned())
    }

    async fn find_active(
        &self,
        kind: TaskKind,
        unique_id: &str,
        owner_id: Uuid,
    ) -> Result<Option<TaskRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|record| {
                record.kind == kind
                    && record.unique_id == unique_id
                    && record.owner_id == owner_id
                    && record.status == TaskStatus::Running
            })
            .cloned())
    }

    async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<()> {
        if let Some(record) = self.records.lock().await.get_mut(&id) {
            if let Some(status) = patch.status {
                record.status = status;
            }
            if let Some(percent) = patch.percent {
                record.percent = percent;
            }
            if let Some(desc) = patch.desc {
                record.desc = desc;
            }
            if let Some(error) = patch.error {
                record.error = Some(error);
            }
            if let Some(need_stop) = patch.need_stop {
                record.need_stop = need_stop;
            }
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_recent(&self, owner_id: Uuid, limit: usize) -> Result<Vec<TaskRecord>> {
        let mut records: Vec<TaskRecord> = self
            .records
            .lock()
            .await
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}
