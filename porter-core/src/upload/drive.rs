use std::path::Path;

use async_trait::async_trait;
use porter_model::UploadDescriptor;

use crate::Result;

/// Identity of a file or folder on the remote drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub file_id: String,
    pub name: String,
}

/// Placement of a single remote upload.
#[derive(Debug, Clone)]
pub struct UploadParams {
    pub name: String,
    pub parent_file_id: String,
}

/// Remote content-addressed drive collaborator.
///
/// The [`UploadDescriptor`] is the whole contract: implementations hand it
/// to the drive's initiate-upload call and own the wire protocol from there,
/// including deduplicated fast uploads when the drive already holds the
/// content.
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// Look up a child by name under a parent folder.
    async fn existing(&self, parent_file_id: &str, name: &str) -> Result<Option<RemoteFile>>;

    /// Create a folder under a parent, returning its identity.
    async fn create_folder(&self, parent_file_id: &str, name: &str) -> Result<RemoteFile>;

    /// Upload the file at `path`, admitted by `descriptor`.
    async fn upload(
        &self,
        path: &Path,
        descriptor: &UploadDescriptor,
        params: &UploadParams,
    ) -> Result<RemoteFile>;
}
