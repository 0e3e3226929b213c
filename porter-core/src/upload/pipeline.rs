use std::path::{Path, PathBuf};
use std::sync::Arc;

use porter_model::LogLine;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::drive::{DriveClient, RemoteFile, UploadParams};
use super::prepare::{self, PrepareOptions};
use super::source::UploadSource;
use crate::task::Task;
use crate::{PipelineError, Result};

/// Result of uploading one local file.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub remote: Option<RemoteFile>,
    pub error: Option<String>,
}

/// Drives one upload run: a single file, or the files directly inside a
/// directory, pushed to the drive sequentially.
///
/// Individual file failures are collected into [`UploadOutcome`]s instead of
/// aborting the batch. Progress and journal lines go to the owning [`Task`];
/// a cancelled token stops the run between files, never mid-transfer.
pub struct MediaUploader {
    drive: Arc<dyn DriveClient>,
    options: PrepareOptions,
}

impl std::fmt::Debug for MediaUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaUploader")
            .field("chunk_size", &self.options.chunk_size)
            .finish()
    }
}

impl MediaUploader {
    pub fn new(drive: Arc<dyn DriveClient>, options: PrepareOptions) -> Self {
        Self { drive, options }
    }

    /// Upload `path` under the remote folder `parent_file_id`.
    pub async fn upload(
        &self,
        path: &Path,
        parent_file_id: &str,
        task: &Task,
        cancel: &CancellationToken,
    ) -> Result<Vec<UploadOutcome>> {
        let meta = tokio::fs::metadata(path).await?;
        let name = file_name(path)?;

        if meta.is_file() {
            task.log(LogLine::text(format!("uploading {name}"))).await;
            let outcome = self.upload_one(path, &name, parent_file_id).await;
            if let Some(error) = &outcome.error {
                task.log(LogLine::text(format!("{name} failed: {error}")))
                    .await;
            } else {
                task.log(LogLine::text(format!("{name} uploaded"))).await;
            }
            task.set_percent(1.0).await;
            return Ok(vec![outcome]);
        }

        // Directory: make sure the remote folder exists, then walk the files
        // directly inside it.
        let folder = match self.drive.existing(parent_file_id, &name).await? {
            Some(folder) => folder,
            None => self.drive.create_folder(parent_file_id, &name).await?,
        };

        let files = child_files(path).await?;
        let total = files.len();
        task.log(LogLine::text(format!("{total} files to upload")))
            .await;

        let mut outcomes = Vec::with_capacity(total);
        for (index, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!("upload of {} stopped after {index} of {total} files", path.display());
                task.log(LogLine::text(
                    "stop requested, aborting remaining uploads",
                ))
                .await;
                break;
            }
            let file_name = file_name(file)?;
            let outcome = self.upload_one(file, &file_name, &folder.file_id).await;
            let position = index + 1;
            match &outcome.error {
                Some(error) => {
                    warn!("upload of {} failed: {error}", file.display());
                    task.log(LogLine::text(format!(
                        "{position} of {total}: {file_name} failed: {error}"
                    )))
                    .await;
                }
                None => {
                    task.log(LogLine::text(format!(
                        "{position} of {total}: {file_name} uploaded"
                    )))
                    .await;
                }
            }
            task.set_percent(position as f32 / total as f32).await;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Upload a single file, refusing to clobber an existing remote child.
    async fn upload_one(&self, path: &Path, name: &str, parent_file_id: &str) -> UploadOutcome {
        match self.try_upload(path, name, parent_file_id).await {
            Ok(remote) => UploadOutcome {
                path: path.to_path_buf(),
                remote: Some(remote),
                error: None,
            },
            Err(err) => UploadOutcome {
                path: path.to_path_buf(),
                remote: None,
                error: Some(err.to_string()),
            },
        }
    }

    async fn try_upload(&self, path: &Path, name: &str, parent_file_id: &str) -> Result<RemoteFile> {
        if let Some(existing) = self.drive.existing(parent_file_id, name).await? {
            return Err(PipelineError::Conflict(format!(
                "{name} already exists remotely as {}",
                existing.file_id
            )));
        }
        let source = UploadSource::file(path);
        let descriptor = prepare::prepare(&source, &self.options).await?;
        let params = UploadParams {
            name: name.to_owned(),
            parent_file_id: parent_file_id.to_owned(),
        };
        self.drive.upload(path, &descriptor, &params).await
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::Validation(format!("{} has no file name", path.display())))
}

/// Regular files directly inside `dir`, in name order. Subdirectories are
/// not descended into.
async fn child_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
