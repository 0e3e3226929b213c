//! Upload pipeline behavior against a fake drive.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use porter_core::{
    DriveClient, MediaUploader, MemoryTaskStore, PrepareOptions, RemoteFile, Result,
    TaskRegistry, TaskSpec, UploadParams,
};
use porter_model::{TaskKind, UploadDescriptor};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Fake drive remembering what was uploaded; children registered up front
/// count as existing.
#[derive(Default)]
struct FakeDrive {
    children: tokio::sync::Mutex<HashMap<(String, String), RemoteFile>>,
    uploads: tokio::sync::Mutex<Vec<(PathBuf, UploadDescriptor)>>,
}

impl FakeDrive {
    async fn register(&self, parent: &str, name: &str) {
        let file = RemoteFile {
            file_id: format!("existing-{name}"),
            name: name.to_owned(),
        };
        self.children
            .lock()
            .await
            .insert((parent.to_owned(), name.to_owned()), file);
    }

    async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[async_trait]
impl DriveClient for FakeDrive {
    async fn existing(&self, parent_file_id: &str, name: &str) -> Result<Option<RemoteFile>> {
        Ok(self
            .children
            .lock()
            .await
            .get(&(parent_file_id.to_owned(), name.to_owned()))
            .cloned())
    }

    async fn create_folder(&self, parent_file_id: &str, name: &str) -> Result<RemoteFile> {
        let folder = RemoteFile {
            file_id: format!("folder-{name}"),
            name: name.to_owned(),
        };
        self.children
            .lock()
            .await
            .insert((parent_file_id.to_owned(), name.to_owned()), folder.clone());
        Ok(folder)
    }

    async fn upload(
        &self,
        path: &Path,
        descriptor: &UploadDescriptor,
        params: &UploadParams,
    ) -> Result<RemoteFile> {
        self.uploads
            .lock()
            .await
            .push((path.to_path_buf(), descriptor.clone()));
        Ok(RemoteFile {
            file_id: format!("file-{}", params.name),
            name: params.name.clone(),
        })
    }
}

async fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, content).await.expect("write file");
    path
}

struct Fixture {
    _dir: tempfile::TempDir,
    media: PathBuf,
    drive: Arc<FakeDrive>,
    uploader: MediaUploader,
    registry: TaskRegistry,
    owner_id: Uuid,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let media = dir.path().join("media");
    tokio::fs::create_dir_all(&media).await.expect("media dir");
    let drive = Arc::new(FakeDrive::default());
    let uploader = MediaUploader::new(
        drive.clone(),
        PrepareOptions {
            token: "drive-token".into(),
            chunk_size: 1024,
        },
    );
    let store = Arc::new(MemoryTaskStore::new());
    let registry = TaskRegistry::new(store, dir.path().join("logs"));
    Fixture {
        media,
        drive,
        uploader,
        registry,
        owner_id: Uuid::new_v4(),
        _dir: dir,
    }
}

impl Fixture {
    async fn task(&self) -> Arc<porter_core::Task> {
        self.registry
            .create(TaskSpec {
                owner_id: self.owner_id,
                kind: TaskKind::UploadToDrive,
                unique_id: Uuid::new_v4().to_string(),
                desc: "upload".into(),
            })
            .await
            .expect("create task")
    }
}

#[tokio::test]
async fn uploads_a_single_file_with_its_descriptor() {
    let fx = fixture().await;
    let path = write_file(&fx.media, "movie.mkv", &vec![7u8; 3000]).await;
    let task = fx.task().await;

    let outcomes = fx
        .uploader
        .upload(&path, "root", &task, &CancellationToken::new())
        .await
        .expect("upload");

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].error.is_none());
    assert_eq!(
        outcomes[0].remote.as_ref().map(|r| r.file_id.as_str()),
        Some("file-movie.mkv")
    );

    let uploads = fx.drive.uploads.lock().await;
    let (_, descriptor) = &uploads[0];
    assert_eq!(descriptor.size, 3000);
    // 3000 bytes in 1024-byte chunks
    assert_eq!(descriptor.part_list.len(), 3);
}

#[tokio::test]
async fn refuses_to_clobber_an_existing_remote_file() {
    let fx = fixture().await;
    let path = write_file(&fx.media, "movie.mkv", b"content").await;
    fx.drive.register("root", "movie.mkv").await;
    let task = fx.task().await;

    let outcomes = fx
        .uploader
        .upload(&path, "root", &task, &CancellationToken::new())
        .await
        .expect("upload");

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].remote.is_none());
    assert!(
        outcomes[0]
            .error
            .as_deref()
            .is_some_and(|error| error.contains("already exists"))
    );
    assert_eq!(fx.drive.upload_count().await, 0);
}

#[tokio::test]
async fn uploads_directory_children_and_collects_failures() {
    let fx = fixture().await;
    let dir = fx.media.join("season-1");
    tokio::fs::create_dir_all(&dir).await.expect("dir");
    write_file(&dir, "e1.mkv", b"one").await;
    write_file(&dir, "e2.mkv", b"two").await;
    write_file(&dir, "e3.mkv", b"three").await;
    // e2 already on the drive, inside the to-be-created folder.
    fx.drive.register("folder-season-1", "e2.mkv").await;
    let task = fx.task().await;

    let outcomes = fx
        .uploader
        .upload(&dir, "root", &task, &CancellationToken::new())
        .await
        .expect("upload");

    assert_eq!(outcomes.len(), 3);
    let failed: Vec<_> = outcomes
        .iter()
        .filter(|outcome| outcome.error.is_some())
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].path.ends_with("e2.mkv"));
    assert_eq!(fx.drive.upload_count().await, 2);
}

#[tokio::test]
async fn a_cancelled_token_stops_the_batch_between_files() {
    let fx = fixture().await;
    let dir = fx.media.join("season-1");
    tokio::fs::create_dir_all(&dir).await.expect("dir");
    write_file(&dir, "e1.mkv", b"one").await;
    write_file(&dir, "e2.mkv", b"two").await;
    let task = fx.task().await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcomes = fx
        .uploader
        .upload(&dir, "root", &task, &cancel)
        .await
        .expect("upload");

    assert!(outcomes.is_empty());
    assert_eq!(fx.drive.upload_count().await, 0);
}

#[tokio::test]
async fn empty_files_are_reported_not_fatal() {
    let fx = fixture().await;
    let path = write_file(&fx.media, "empty.bin", b"").await;
    let task = fx.task().await;

    let outcomes = fx
        .uploader
        .upload(&path, "root", &task, &CancellationToken::new())
        .await
        .expect("upload");

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].error.is_some());
    assert_eq!(fx.drive.upload_count().await, 0);
}
