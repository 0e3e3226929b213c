use porter_model::UploadDescriptor;

use super::{fingerprint, partition, source::UploadSource};
use crate::Result;

/// Default multipart slice size, 10 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Inputs for building an upload descriptor.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Drive access token the proof code is derived from.
    pub token: String,
    pub chunk_size: u64,
}

impl PrepareOptions {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Build the immutable descriptor the drive's initiate-upload call consumes.
///
/// Runs the fingerprint first — the proof offset derivation needs the
/// measured size — then the proof code, then the part plan. The first
/// failing step aborts; callers must not attempt an upload without a
/// descriptor.
pub async fn prepare(source: &UploadSource, options: &PrepareOptions) -> Result<UploadDescriptor> {
    let digest = fingerprint::digest(source, options.chunk_size as usize).await?;
    let proof_code = fingerprint::proof_code(source, &options.token, digest.size).await?;
    let part_list = partition::plan_parts(digest.size, options.chunk_size)?;
    Ok(UploadDescriptor {
        size: digest.size,
        content_hash: digest.hash,
        proof_code,
        part_list,
    })
}
