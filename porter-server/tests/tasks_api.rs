//! Handler-level tests over the in-memory store and a fake drive.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use porter_core::{
    DriveClient, MediaUploader, MemoryTaskStore, PrepareOptions, RemoteFile, Result, TaskRegistry,
    TaskSpec, UploadParams,
};
use porter_model::{TaskKind, TaskStatus, UploadDescriptor};
use porter_server::{AppState, create_app};
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Debug, Default)]
struct AcceptingDrive;

#[async_trait]
impl DriveClient for AcceptingDrive {
    async fn existing(&self, _parent_file_id: &str, _name: &str) -> Result<Option<RemoteFile>> {
        Ok(None)
    }

    async fn create_folder(&self, _parent_file_id: &str, name: &str) -> Result<RemoteFile> {
        Ok(RemoteFile {
            file_id: format!("folder-{name}"),
            name: name.to_owned(),
        })
    }

    async fn upload(
        &self,
        _path: &Path,
        _descriptor: &UploadDescriptor,
        params: &UploadParams,
    ) -> Result<RemoteFile> {
        Ok(RemoteFile {
            file_id: format!("file-{}", params.name),
            name: params.name.clone(),
        })
    }
}

struct TestApp {
    server: TestServer,
    registry: Arc<TaskRegistry>,
    owner_id: Uuid,
    _dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(MemoryTaskStore::new());
    let registry = Arc::new(TaskRegistry::new(store, dir.path().join("logs")));
    let uploader = Arc::new(MediaUploader::new(
        Arc::new(AcceptingDrive),
        PrepareOptions {
            token: "test-token".into(),
            chunk_size: 1024,
        },
    ));
    let owner_id = Uuid::new_v4();
    let state = AppState {
        registry: registry.clone(),
        uploader,
        owner_id,
        root_folder_id: "root".into(),
    };
    TestApp {
        server: TestServer::new(create_app(state)).expect("test server"),
        registry,
        owner_id,
        _dir: dir,
    }
}

impl TestApp {
    async fn create_task(&self, unique_id: &str) -> Arc<porter_core::Task> {
        self.registry
            .create(TaskSpec {
                owner_id: self.owner_id,
                kind: TaskKind::UploadToDrive,
                unique_id: unique_id.into(),
                desc: format!("upload {unique_id}"),
            })
            .await
            .expect("create task")
    }
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_app();
    let response = app.server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn listing_starts_empty() {
    let app = test_app();
    let response = app.server.get("/api/tasks").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["tasks"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn listing_shows_created_tasks() {
    let app = test_app();
    app.create_task("a.mkv").await;
    app.create_task("b.mkv").await;

    let response = app.server.get("/api/tasks").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["tasks"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn unknown_task_profile_is_not_found() {
    let app = test_app();
    let response = app.server.get(&format!("/api/tasks/{}", Uuid::new_v4())).await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn profile_reflects_the_record() {
    let app = test_app();
    let task = app.create_task("movie.mkv").await;

    let response = app.server.get(&format!("/api/tasks/{}", task.id())).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["desc"], "upload movie.mkv");
    assert_eq!(body["status"], json!("Running"));
}

#[tokio::test]
async fn pause_rejects_a_finished_task() {
    let app = test_app();
    let task = app.create_task("movie.mkv").await;
    task.finish().await.expect("finish");

    let response = app
        .server
        .post(&format!("/api/tasks/{}/pause", task.id()))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn forced_pause_pauses_the_record() {
    let app = test_app();
    let task = app.create_task("movie.mkv").await;

    let response = app
        .server
        .post(&format!("/api/tasks/{}/pause?force=true", task.id()))
        .await;
    response.assert_status_ok();

    let profile = task.fetch_profile(false).await.expect("profile");
    assert_eq!(profile.status, TaskStatus::Paused);
}

#[tokio::test]
async fn upload_of_a_missing_path_is_rejected() {
    let app = test_app();
    let response = app
        .server
        .post("/api/uploads")
        .json(&json!({ "filepath": "/definitely/not/here.mkv" }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn upload_runs_to_completion_under_a_task() {
    let app = test_app();
    let media = app._dir.path().join("movie.mkv");
    tokio::fs::write(&media, vec![1u8; 4096]).await.expect("write media");

    let response = app
        .server
        .post("/api/uploads")
        .json(&json!({ "filepath": media }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let task_id: Uuid =
        serde_json::from_value(body["task_id"].clone()).expect("task id in response");

    // The run finishes in the background; poll the profile briefly.
    let mut status = TaskStatus::Running;
    for _ in 0..50 {
        let response = app.server.get(&format!("/api/tasks/{task_id}")).await;
        response.assert_status_ok();
        let profile: Value = response.json();
        status = serde_json::from_value(profile["status"].clone()).expect("status");
        if status == TaskStatus::Finished {
            let lines = profile["lines"].as_array().expect("lines");
            assert!(
                lines
                    .iter()
                    .any(|line| line.to_string().contains("uploaded"))
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, TaskStatus::Finished);

    // A second upload of the same path is allowed once the first finished.
    let response = app
        .server
        .post("/api/uploads")
        .json(&json!({ "filepath": media }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn concurrent_upload_of_the_same_path_conflicts() {
    let app = test_app();
    // Pin a running task on the path so the upload request conflicts.
    let media = app._dir.path().join("movie.mkv");
    tokio::fs::write(&media, b"content").await.expect("write media");
    app.create_task(&media.display().to_string()).await;

    let response = app
        .server
        .post("/api/uploads")
        .json(&json!({ "filepath": media }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}
