use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use porter_core::TaskStore;
use porter_model::TaskProfile;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{AppResult, AppState};

pub async fn list_tasks(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let tasks = state
        .registry
        .store()
        .list_recent(state.owner_id, 50)
        .await?;
    Ok(Json(json!({ "tasks": tasks })))
}

#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    /// Include the on-disk log lines. Defaults to true.
    #[serde(default = "default_true")]
    log: bool,
}

fn default_true() -> bool {
    true
}

pub async fn task_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ProfileParams>,
) -> AppResult<Json<TaskProfile>> {
    let task = state.registry.get(id, state.owner_id).await?;
    let profile = task.fetch_profile(params.log).await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct PauseParams {
    #[serde(default)]
    force: bool,
}

pub async fn pause_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PauseParams>,
) -> AppResult<Json<Value>> {
    let task = state.registry.get(id, state.owner_id).await?;
    task.pause(params.force).await?;
    info!("pause requested for task {id} (force: {})", params.force);
    Ok(Json(json!({ "status": "success" })))
}
