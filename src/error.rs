//! Error types for the upload pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failures obtaining or refreshing a storage credential.
///
/// Always fatal to the operation that needed the credential; never downgraded
/// to "no token".
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("auth endpoint returned status {0}")]
    Status(u16),

    #[error("auth response missing header {0}")]
    MissingHeader(&'static str),

    #[error("invalid token lifetime header: {0:?}")]
    InvalidLifetime(String),
}

/// Failures talking to the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("store accepted the object but returned no Etag header")]
    MissingEtag,
}

/// Failures splitting the source file into segment files.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("source file is empty: {}", .0.display())]
    EmptySource(PathBuf),

    #[error("segment offsets overflow u64 (file_len {file_len}, chunk_size {chunk_size})")]
    SourceTooLarge { file_len: u64, chunk_size: u64 },
}

/// Failures of the end-to-end split upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Split(#[from] SplitError),

    #[error("failed to read segment file {name}: {source}")]
    SegmentRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("segment {name} upload failed: {source}")]
    Segment {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("manifest serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("manifest commit failed: {0}")]
    Manifest(StoreError),
}
