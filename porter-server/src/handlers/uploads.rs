use std::path::PathBuf;

use axum::{extract::State, response::Json};
use porter_core::TaskSpec;
use porter_model::{LogLine, TaskKind};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Local file or directory to push to the drive.
    pub filepath: PathBuf,
    /// Remote folder to upload into; defaults to the configured root.
    pub parent_file_id: Option<String>,
}

/// Start an upload pipeline run tracked by a task. Returns immediately with
/// the task id; progress, logs and cancellation go through the task API.
pub async fn start_upload(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> AppResult<Json<Value>> {
    if !request.filepath.exists() {
        return Err(AppError::bad_request(format!(
            "{} does not exist",
            request.filepath.display()
        )));
    }

    let unique_id = request.filepath.display().to_string();
    let task = state
        .registry
        .create(TaskSpec {
            owner_id: state.owner_id,
            kind: TaskKind::UploadToDrive,
            unique_id: unique_id.clone(),
            desc: format!("upload {unique_id}"),
        })
        .await?;
    info!("upload of {unique_id} tracked by task {}", task.id());

    let cancel = task.subscribe_stop().await;
    let parent_file_id = request
        .parent_file_id
        .unwrap_or_else(|| state.root_folder_id.clone());
    let uploader = state.uploader.clone();
    let registry = state.registry.clone();
    let run_task = task.clone();

    tokio::spawn(async move {
        let ended = match uploader
            .upload(&request.filepath, &parent_file_id, &run_task, &cancel)
            .await
        {
            Ok(outcomes) => {
                let failed = outcomes
                    .iter()
                    .filter(|outcome| outcome.error.is_some())
                    .count();
                run_task
                    .log(LogLine::text(format!(
                        "{} uploaded, {failed} failed",
                        outcomes.len() - failed
                    )))
                    .await;
                run_task.finish().await
            }
            Err(err) => run_task.fail(&err).await,
        };
        if let Err(err) = ended {
            warn!("closing task {} failed: {err}", run_task.id());
        }
        registry.evict(run_task.id()).await;
    });

    Ok(Json(json!({
        "status": "success",
        "task_id": task.id(),
    })))
}
