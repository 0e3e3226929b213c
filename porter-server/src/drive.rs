//! HTTP client for the remote drive API.
//!
//! Thin wire glue behind [`DriveClient`]: the interesting contract is the
//! `UploadDescriptor` built by porter-core; this module just moves it (and
//! the content bytes, when the drive does not already hold them) over HTTP.

use std::path::Path;

use async_trait::async_trait;
use porter_core::upload::{DriveClient, RemoteFile, UploadParams};
use porter_core::{PipelineError, Result};
use porter_model::UploadDescriptor;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::config::DriveConfig;

#[derive(Debug, Deserialize)]
struct RemoteFilePayload {
    file_id: String,
    name: String,
}

impl From<RemoteFilePayload> for RemoteFile {
    fn from(payload: RemoteFilePayload) -> Self {
        RemoteFile {
            file_id: payload.file_id,
            name: payload.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadSession {
    upload_id: String,
    file_id: String,
    /// The drive already holds this content; no part transfers needed.
    #[serde(default)]
    rapid_upload: bool,
    #[serde(default)]
    part_urls: Vec<String>,
}

/// Drive client speaking the remote HTTP API.
#[derive(Debug, Clone)]
pub struct HttpDriveClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    chunk_size: u64,
}

impl HttpDriveClient {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            chunk_size: config.chunk_size,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl DriveClient for HttpDriveClient {
    async fn existing(&self, parent_file_id: &str, name: &str) -> Result<Option<RemoteFile>> {
        let response = self
            .http
            .get(self.url("/api/files/lookup"))
            .bearer_auth(&self.access_token)
            .query(&[("parent_file_id", parent_file_id), ("name", name)])
            .send()
            .await
            .map_err(remote_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let payload: RemoteFilePayload = response
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;
        Ok(Some(payload.into()))
    }

    async fn create_folder(&self, parent_file_id: &str, name: &str) -> Result<RemoteFile> {
        let payload: RemoteFilePayload = self
            .http
            .post(self.url("/api/folders"))
            .bearer_auth(&self.access_token)
            .json(&json!({ "parent_file_id": parent_file_id, "name": name }))
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;
        Ok(payload.into())
    }

    async fn upload(
        &self,
        path: &Path,
        descriptor: &UploadDescriptor,
        params: &UploadParams,
    ) -> Result<RemoteFile> {
        let session: UploadSession = self
            .http
            .post(self.url("/api/uploads"))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "parent_file_id": &params.parent_file_id,
                "name": &params.name,
                "size": descriptor.size,
                "content_hash": &descriptor.content_hash,
                "proof_code": &descriptor.proof_code,
                "part_info_list": &descriptor.part_list,
            }))
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;

        if session.rapid_upload {
            info!("{} admitted without transfer (content known)", params.name);
            return Ok(RemoteFile {
                file_id: session.file_id,
                name: params.name.clone(),
            });
        }

        if session.part_urls.len() != descriptor.part_list.len() {
            return Err(PipelineError::Validation(format!(
                "drive returned {} part targets for {} planned parts",
                session.part_urls.len(),
                descriptor.part_list.len()
            )));
        }

        // Parts move sequentially, one bounded buffer at a time.
        let mut file = tokio::fs::File::open(path).await?;
        for (index, part_url) in session.part_urls.iter().enumerate() {
            let mut buf = vec![0u8; self.chunk_size as usize];
            let mut filled = 0;
            while filled < buf.len() {
                let n = file.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            buf.truncate(filled);
            debug!("{}: part {} ({} bytes)", params.name, index + 1, filled);
            self.http
                .put(part_url)
                .body(buf)
                .send()
                .await
                .map_err(remote_err)?
                .error_for_status()
                .map_err(remote_err)?;
        }

        let payload: RemoteFilePayload = self
            .http
            .post(self.url(&format!("/api/uploads/{}/complete", session.upload_id)))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)?;
        Ok(payload.into())
    }
}

fn remote_err(err: reqwest::Error) -> PipelineError {
    PipelineError::Io(std::io::Error::other(err))
}
