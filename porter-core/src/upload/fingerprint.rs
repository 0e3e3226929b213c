use base64::{Engine as _, engine::general_purpose::STANDARD};
use digest::Digest as _;
use md5::Md5;
use sha1::Sha1;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::source::UploadSource;
use crate::{PipelineError, Result};

/// How many content bytes the proof-of-possession sample covers at most.
const PROOF_SAMPLE_LEN: u64 = 8;

/// Whole-content fingerprint: uppercase hex SHA-1 plus the measured size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub hash: String,
    pub size: u64,
}

/// Compute the whole-content SHA-1 of `source`, reading in `buffer_size`
/// slices. The buffer bounds memory only — the resulting hash is identical
/// for any buffer size and for both source variants.
pub async fn digest(source: &UploadSource, buffer_size: usize) -> Result<Digest> {
    if buffer_size == 0 {
        return Err(PipelineError::Validation(
            "digest buffer size must be positive".into(),
        ));
    }
    let mut hasher = Sha1::new();
    let size = match source {
        UploadSource::File { path } => {
            let mut file = File::open(path).await?;
            let mut buf = vec![0u8; buffer_size];
            let mut total = 0u64;
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                total += n as u64;
            }
            total
        }
        UploadSource::Memory { bytes } => {
            for segment in bytes.chunks(buffer_size) {
                hasher.update(segment);
            }
            bytes.len() as u64
        }
    };
    Ok(Digest {
        hash: hex::encode_upper(hasher.finalize()),
        size,
    })
}

/// Compute the proof-of-possession code: base64 of up to eight content bytes
/// at an offset derived from the access token.
///
/// `offset = (first 8 bytes of md5(token) as a big-endian u64) % size`, then
/// `min(8, size - offset)` bytes are sampled. Deterministic for identical
/// `(token, content)` regardless of the source variant.
pub async fn proof_code(source: &UploadSource, token: &str, size: u64) -> Result<String> {
    if size == 0 {
        return Err(PipelineError::Validation(
            "proof code is undefined for an empty source".into(),
        ));
    }
    let md5 = Md5::digest(token.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&md5[..8]);
    let offset = u64::from_be_bytes(prefix) % size;
    let take = u64::min(PROOF_SAMPLE_LEN, size - offset) as usize;
    let sample = source.read_at(offset, take).await?;
    Ok(STANDARD.encode(sample))
}
