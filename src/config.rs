use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::auth::ExpiryPolicy;

/// Where and how to authenticate against the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub auth_url: String,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub expiry: ExpiryPolicy,
}

/// Containers, scratch space and segment sizing for the upload pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Container the merged logical object is committed to.
    pub container: String,
    /// Container the segment objects are uploaded to.
    pub segment_container: String,
    /// Local directory for segment temp files.
    pub temp_dir: PathBuf,
    pub chunk_size_mib: u64,
    /// Segment uploads in flight at once; 1 keeps the pipeline fully sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl UploadConfig {
    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mib.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn trace_loaded(&self) {
        // Summary only; the full struct carries the storage password.
        info!(
            auth_url = %self.auth.auth_url,
            container = %self.upload.container,
            segment_container = %self.upload.segment_container,
            temp_dir = %self.upload.temp_dir.display(),
            chunk_size_mib = self.upload.chunk_size_mib,
            concurrency = self.upload.concurrency,
            "Loaded Config"
        );
    }
}
