use std::io::SeekFrom;
use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::Result;

/// A byte source for upload preparation.
///
/// Either a file on disk read in bounded chunks, or a fully materialized
/// buffer. Fingerprints computed over both variants are bit-identical for
/// identical content.
#[derive(Debug, Clone)]
pub enum UploadSource {
    File { path: PathBuf },
    Memory { bytes: Vec<u8> },
}

impl UploadSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn memory(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memory {
            bytes: bytes.into(),
        }
    }

    /// Total size in bytes.
    pub async fn len(&self) -> Result<u64> {
        match self {
            Self::File { path } => Ok(tokio::fs::metadata(path).await?.len()),
            Self::Memory { bytes } => Ok(bytes.len() as u64),
        }
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Read up to `len` bytes starting at `offset`. Short reads happen only
    /// at end of content.
    pub(crate) async fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        match self {
            Self::File { path } => {
                let mut file = File::open(path).await?;
                file.seek(SeekFrom::Start(offset)).await?;
                let mut buf = vec![0u8; len];
                let mut filled = 0;
                while filled < len {
                    let n = file.read(&mut buf[filled..]).await?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                buf.truncate(filled);
                Ok(buf)
            }
            Self::Memory { bytes } => {
                let start = usize::min(offset as usize, bytes.len());
                let end = usize::min(start.saturating_add(len), bytes.len());
                Ok(bytes[start..end].to_vec())
            }
        }
    }
}
