use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::handlers;
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", get(handlers::tasks::list_tasks))
        .route("/api/tasks/{id}", get(handlers::tasks::task_profile))
        .route("/api/tasks/{id}/pause", post(handlers::tasks::pause_task))
        .route("/api/uploads", post(handlers::uploads::start_upload))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
