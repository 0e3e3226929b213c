use async_trait::async_trait;
use porter_model::{TaskKind, TaskRecord, TaskStatus};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use super::store::{NewTask, TaskPatch, TaskStore};
use crate::{PipelineError, Result};

/// Postgres-backed [`TaskStore`].
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    /// Connect and run the idempotent schema migration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL task store");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(store_err)?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Wrap an existing pool; the schema is assumed to be in place.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id UUID PRIMARY KEY,
                owner_id UUID NOT NULL,
                kind SMALLINT NOT NULL,
                unique_id TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status SMALLINT NOT NULL DEFAULT 1,
                percent REAL NOT NULL DEFAULT 0,
                log_path TEXT,
                error TEXT,
                need_stop BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        // One Running task per dedupe key. The registry's pre-insert check is
        // not atomic across processes; this index is the backstop.
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS tasks_active_key
            ON tasks (kind, unique_id, owner_id) WHERE status = 1
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn insert(&self, task: NewTask) -> Result<TaskRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO tasks (id, owner_id, kind, unique_id, description, status, log_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, kind, unique_id, description, status, percent,
                      log_path, error, need_stop, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task.owner_id)
        .bind(task.kind)
        .bind(&task.unique_id)
        .bind(&task.desc)
        .bind(TaskStatus::Running)
        .bind(&task.log_path)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_err)?;
        row_to_record(&row)
    }

    async fn find(&self, id: Uuid, owner_id: Uuid) -> Result<Option<TaskRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, kind, unique_id, description, status, percent,
                   log_path, error, need_stop, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_active(
        &self,
        kind: TaskKind,
        unique_id: &str,
        owner_id: Uuid,
    ) -> Result<Option<TaskRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, kind, unique_id, description, status, percent,
                   log_path, error, need_stop, created_at, updated_at
            FROM tasks
            WHERE kind = $1 AND unique_id = $2 AND owner_id = $3 AND status = $4
            LIMIT 1
            "#,
        )
        .bind(kind)
        .bind(unique_id)
        .bind(owner_id)
        .bind(TaskStatus::Running)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks SET
                status = COALESCE($2, status),
                percent = COALESCE($3, percent),
                description = COALESCE($4, description),
                error = COALESCE($5, error),
                need_stop = COALESCE($6, need_stop),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.status)
        .bind(patch.percent)
        .bind(patch.desc)
        .bind(patch.error)
        .bind(patch.need_stop)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_recent(&self, owner_id: Uuid, limit: usize) -> Result<Vec<TaskRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, kind, unique_id, description, status, percent,
                   log_path, error, need_stop, created_at, updated_at
            FROM tasks
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: &PgRow) -> Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.try_get("id").map_err(store_err)?,
        owner_id: row.try_get("owner_id").map_err(store_err)?,
        kind: row.try_get("kind").map_err(store_err)?,
        unique_id: row.try_get("unique_id").map_err(store_err)?,
        desc: row.try_get("description").map_err(store_err)?,
        status: row.try_get("status").map_err(store_err)?,
        percent: row.try_get("percent").map_err(store_err)?,
        log_path: row.try_get("log_path").map_err(store_err)?,
        error: row.try_get("error").map_err(store_err)?,
        need_stop: row.try_get("need_stop").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn store_err(err: sqlx::Error) -> PipelineError {
    PipelineError::Store(err.to_string())
}

fn insert_err(err: sqlx::Error) -> PipelineError {
    if let sqlx::Error::Database(db) = &err {
        // 23505: unique_violation, raised by the partial index on the
        // active dedupe key
        if db.code().as_deref() == Some("23505") {
            return PipelineError::Conflict(
                "a running task with the same key already exists".into(),
            );
        }
    }
    store_err(err)
}
