use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use porter_model::{LogLine, TaskProfile, TaskRecord, TaskStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::journal::Journal;
use super::schedule::{Periodic, Tick};
use super::store::{TaskPatch, TaskStore};
use super::throttle::Throttle;
use crate::{PipelineError, Result};

/// Journal flushes and progress persistence each run at most once per this
/// window.
const WRITE_WINDOW: Duration = Duration::from_secs(5);
/// How often the stop watcher re-reads the persisted record.
const STOP_POLL_PERIOD: Duration = Duration::from_secs(5);
/// Grace period between a pause request and the forced `Finished`
/// transition.
const FORCED_FINISH_GRACE: Duration = Duration::from_secs(3);

/// Best-effort partial update callers may apply to a running task.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub percent: Option<f32>,
    pub desc: Option<String>,
}

/// In-process handle for one durable task.
///
/// Owns the journal buffer and a cached snapshot of the record; the store
/// stays the source of truth for status and stop requests, so anything an
/// external actor may have written is re-read, never assumed.
pub struct Task {
    id: Uuid,
    owner_id: Uuid,
    store: Arc<dyn TaskStore>,
    record: tokio::sync::RwLock<TaskRecord>,
    journal: Arc<Journal>,
    percent: Arc<tokio::sync::Mutex<f32>>,
    log_throttle: Throttle,
    percent_throttle: Throttle,
    stop: CancellationToken,
    watcher: tokio::sync::Mutex<Option<Periodic>>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .finish()
    }
}

impl Task {
    /// Build a handle over an already persisted record.
    pub(crate) fn from_record(
        record: TaskRecord,
        store: Arc<dyn TaskStore>,
        logs_dir: &Path,
    ) -> Arc<Self> {
        let journal = Arc::new(Journal::new(
            record.log_path.as_deref().map(|name| logs_dir.join(name)),
        ));
        let percent = Arc::new(tokio::sync::Mutex::new(record.percent));

        let log_throttle = {
            let journal = journal.clone();
            let id = record.id;
            Throttle::new(WRITE_WINDOW, move || {
                let journal = journal.clone();
                async move {
                    if let Err(err) = journal.flush().await {
                        warn!("journal flush for task {id} failed: {err}");
                    }
                }
                .boxed()
            })
        };

        let percent_throttle = {
            let store = store.clone();
            let percent = percent.clone();
            let id = record.id;
            Throttle::new(WRITE_WINDOW, move || {
                let store = store.clone();
                let percent = percent.clone();
                async move {
                    let value = *percent.lock().await;
                    debug!("task {id} progress {:.2}%", value * 100.0);
                    let patch = TaskPatch {
                        percent: Some(value),
                        ..Default::default()
                    };
                    if let Err(err) = store.update(id, patch).await {
                        warn!("progress update for task {id} failed: {err}");
                    }
                }
                .boxed()
            })
        };

        Arc::new(Self {
            id: record.id,
            owner_id: record.owner_id,
            store,
            record: tokio::sync::RwLock::new(record),
            journal,
            percent,
            log_throttle,
            percent_throttle,
            stop: CancellationToken::new(),
            watcher: tokio::sync::Mutex::new(None),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// Clone of the cached record snapshot. May be stale relative to the
    /// store.
    pub async fn snapshot(&self) -> TaskRecord {
        self.record.read().await.clone()
    }

    /// Append a structured line to the journal. Durable flushes are
    /// throttled; end-of-task paths flush unconditionally.
    pub async fn log(&self, line: LogLine) {
        self.journal.push(line).await;
        self.log_throttle.call().await;
    }

    /// Report progress in `[0, 1]`. Persistence is throttled; the latest
    /// value wins within a window.
    pub async fn set_percent(&self, percent: f32) {
        *self.percent.lock().await = percent;
        self.percent_throttle.call().await;
    }

    /// Best-effort persisted merge of progress/description. Failures are
    /// logged and swallowed — telemetry must not fail the job.
    pub async fn update(&self, update: TaskUpdate) {
        let patch = TaskPatch {
            percent: update.percent,
            desc: update.desc.clone(),
            ..Default::default()
        };
        if let Err(err) = self.store.update(self.id, patch).await {
            warn!("update for task {} failed: {err}", self.id);
            return;
        }
        let mut record = self.record.write().await;
        if let Some(percent) = update.percent {
            record.percent = percent;
        }
        if let Some(desc) = update.desc {
            record.desc = desc;
        }
        record.updated_at = Utc::now();
    }

    /// Re-read the record and return it as a profile, optionally with the
    /// on-disk log lines. The log read is best-effort — an unreadable file
    /// yields no lines, not an error.
    pub async fn fetch_profile(&self, with_log: bool) -> Result<TaskProfile> {
        let record = self
            .store
            .find(self.id, self.owner_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("no record for task {}", self.id)))?;

        let lines = match (with_log, self.journal.path()) {
            (true, Some(path)) => Journal::read_lines(path).await,
            _ => Vec::new(),
        };

        *self.record.write().await = record.clone();

        Ok(TaskProfile {
            id: record.id,
            status: record.status,
            desc: record.desc,
            percent: record.percent,
            lines,
            error: record.error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Request the task to stop.
    ///
    /// Sets `need_stop` on the record; with `force` the record is marked
    /// `Paused` right away and the stop is journaled. Either way the record
    /// is driven to `Finished` after a fixed grace period whether or not the
    /// running work observed the stop — the record can read `Finished` while
    /// the operation is still unwinding (see DESIGN.md).
    ///
    /// This method never reaches the running operation directly; work only
    /// sees the request through the stop watcher's poll.
    pub async fn pause(&self, force: bool) -> Result<()> {
        let record = self
            .store
            .find(self.id, self.owner_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("no record for task {}", self.id)))?;
        if record.status != TaskStatus::Running {
            return Err(PipelineError::Conflict(format!(
                "task {} is not running",
                self.id
            )));
        }

        let patch = TaskPatch {
            need_stop: Some(true),
            status: force.then_some(TaskStatus::Paused),
            ..Default::default()
        };
        self.store.update(self.id, patch).await?;
        {
            let mut cached = self.record.write().await;
            cached.need_stop = true;
            if force {
                cached.status = TaskStatus::Paused;
            }
            cached.updated_at = Utc::now();
        }

        if force {
            self.journal.push(LogLine::text("manually stopped")).await;
            self.log_throttle.flush_now().await;
        }

        let store = self.store.clone();
        let id = self.id;
        tokio::spawn(async move {
            tokio::time::sleep(FORCED_FINISH_GRACE).await;
            let patch = TaskPatch {
                status: Some(TaskStatus::Finished),
                ..Default::default()
            };
            if let Err(err) = store.update(id, patch).await {
                warn!("deferred finish for task {id} failed: {err}");
            }
        });
        Ok(())
    }

    /// Mark the task finished. Buffered journal lines are flushed before the
    /// status write — nothing logged before `finish` may be lost.
    pub async fn finish(&self) -> Result<()> {
        self.log_throttle.flush_now().await;
        let patch = TaskPatch {
            need_stop: Some(false),
            status: Some(TaskStatus::Finished),
            ..Default::default()
        };
        self.store.update(self.id, patch).await?;
        let mut cached = self.record.write().await;
        cached.need_stop = false;
        cached.status = TaskStatus::Finished;
        cached.updated_at = Utc::now();
        Ok(())
    }

    /// Record a failure and finish the task. The error lands both in the
    /// journal and in the record's `error` field; the task never stays in an
    /// ambiguous non-terminal state.
    pub async fn fail(&self, error: impl std::fmt::Display) -> Result<()> {
        let message = error.to_string();
        self.journal.push(LogLine::text(message.clone())).await;
        self.log_throttle.flush_now().await;
        let patch = TaskPatch {
            status: Some(TaskStatus::Finished),
            error: Some(message.clone()),
            ..Default::default()
        };
        self.store.update(self.id, patch).await?;
        let mut cached = self.record.write().await;
        cached.status = TaskStatus::Finished;
        cached.error = Some(message);
        cached.updated_at = Utc::now();
        Ok(())
    }

    /// Running for more than 50 minutes since creation. Advisory only — no
    /// transition is triggered.
    pub async fn is_stale_by_duration(&self) -> bool {
        let record = self.record.read().await;
        record.status == TaskStatus::Running
            && Utc::now() - record.created_at > chrono::Duration::minutes(50)
    }

    /// Running but not updated for more than 30 seconds. Advisory only.
    pub async fn is_stalled(&self) -> bool {
        let record = self.record.read().await;
        record.status == TaskStatus::Running
            && Utc::now() - record.updated_at > chrono::Duration::seconds(30)
    }

    /// Subscribe to stop notifications.
    ///
    /// Starts (once) a periodic re-read of the persisted record. An observed
    /// `need_stop` cancels the returned token exactly once and ends the
    /// poll; a record that reached a terminal state ends the poll without
    /// cancelling. This poll is the only path from [`Task::pause`] to
    /// running work.
    pub async fn subscribe_stop(&self) -> CancellationToken {
        let mut watcher = self.watcher.lock().await;
        if watcher.is_none() {
            let store = self.store.clone();
            let id = self.id;
            let owner_id = self.owner_id;
            let token = self.stop.clone();
            *watcher = Some(Periodic::spawn(STOP_POLL_PERIOD, move || {
                let store = store.clone();
                let token = token.clone();
                async move {
                    let record = match store.find(id, owner_id).await {
                        Ok(Some(record)) => record,
                        Ok(None) => return Tick::Stop,
                        Err(err) => {
                            debug!("stop poll for task {id} failed: {err}");
                            return Tick::Continue;
                        }
                    };
                    if record.need_stop {
                        token.cancel();
                        return Tick::Stop;
                    }
                    if record.status != TaskStatus::Running {
                        return Tick::Stop;
                    }
                    Tick::Continue
                }
            }));
        }
        self.stop.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::memory::MemoryTaskStore;
    use porter_model::TaskKind;

    fn record_with_ages(created_secs_ago: i64, updated_secs_ago: i64) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            kind: TaskKind::Other,
            unique_id: "unique".into(),
            desc: "desc".into(),
            status: TaskStatus::Running,
            percent: 0.0,
            log_path: None,
            error: None,
            need_stop: false,
            created_at: now - chrono::Duration::seconds(created_secs_ago),
            updated_at: now - chrono::Duration::seconds(updated_secs_ago),
        }
    }

    fn task_for(record: TaskRecord) -> Arc<Task> {
        let store = Arc::new(MemoryTaskStore::new());
        Task::from_record(record, store, Path::new("/tmp"))
    }

    #[tokio::test]
    async fn stale_by_duration_needs_running_and_fifty_minutes() {
        let task = task_for(record_with_ages(51 * 60, 0));
        assert!(task.is_stale_by_duration().await);

        let task = task_for(record_with_ages(49 * 60, 0));
        assert!(!task.is_stale_by_duration().await);

        let mut record = record_with_ages(51 * 60, 0);
        record.status = TaskStatus::Finished;
        let task = task_for(record);
        assert!(!task.is_stale_by_duration().await);
    }

    #[tokio::test]
    async fn stale_by_duration_ignores_updated_at_and_percent() {
        let mut record = record_with_ages(51 * 60, 0);
        record.percent = 0.99;
        record.updated_at = Utc::now();
        let task = task_for(record);
        assert!(task.is_stale_by_duration().await);
    }

    #[tokio::test]
    async fn stalled_needs_running_and_thirty_seconds_without_update() {
        let task = task_for(record_with_ages(60, 31));
        assert!(task.is_stalled().await);

        let task = task_for(record_with_ages(60, 5));
        assert!(!task.is_stalled().await);

        let mut record = record_with_ages(60, 31);
        record.status = TaskStatus::Paused;
        let task = task_for(record);
        assert!(!task.is_stalled().await);
    }
}
