/// One slice of a multipart upload, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartInfo {
    pub part_number: u32,
}

/// Everything the remote drive needs to admit an upload, built before any
/// content bytes move.
///
/// Immutable once built. `content_hash` covers the whole byte stream no
/// matter how it was chunked for reading; `part_list` always holds
/// `ceil(size / chunk_size)` contiguous entries numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UploadDescriptor {
    pub size: u64,
    /// Uppercase hex SHA-1 of the full content.
    pub content_hash: String,
    /// Base64 proof-of-possession sample derived from the access token.
    pub proof_code: String,
    pub part_list: Vec<PartInfo>,
}
