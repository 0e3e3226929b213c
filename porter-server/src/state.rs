use std::sync::Arc;

use porter_core::{MediaUploader, TaskRegistry};
use uuid::Uuid;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TaskRegistry>,
    pub uploader: Arc<MediaUploader>,
    /// Owner recorded on every task this instance creates.
    pub owner_id: Uuid,
    /// Remote folder uploads land in unless a request names another.
    pub root_folder_id: String,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("owner_id", &self.owner_id)
            .field("root_folder_id", &self.root_folder_id)
            .finish()
    }
}
