//! Upload preparation and the pipeline driver.
//!
//! Preparation is pure bookkeeping over local bytes: a whole-content SHA-1
//! fingerprint, a token-derived proof-of-possession sample and a 1-indexed
//! multipart plan, assembled into a `porter_model::UploadDescriptor`. The
//! descriptor is the entire contract with the remote drive; its wire
//! protocol lives behind [`DriveClient`].

pub mod drive;
pub mod fingerprint;
pub mod partition;
pub mod pipeline;
pub mod prepare;
pub mod source;

pub use drive::{DriveClient, RemoteFile, UploadParams};
pub use fingerprint::{Digest, digest, proof_code};
pub use partition::plan_parts;
pub use pipeline::{MediaUploader, UploadOutcome};
pub use prepare::{DEFAULT_CHUNK_SIZE, PrepareOptions, prepare};
pub use source::UploadSource;
