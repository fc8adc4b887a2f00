use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::ExpiryPolicy;
use crate::config::{AppConfig, AuthConfig, UploadConfig};

#[derive(Deserialize)]
struct StaticConfig {
    auth: AuthSection,
    upload: UploadSection,
}

#[derive(Deserialize)]
struct AuthSection {
    url: String,
    #[serde(default)]
    expiry: ExpiryPolicy,
}

#[derive(Deserialize)]
struct UploadSection {
    container: String,
    segment_container: String,
    temp_dir: std::path::PathBuf,
    chunk_size_mib: u64,
    #[serde(default = "default_concurrency")]
    concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

/// Loads a static YAML config file (no secrets) and injects required env vars
/// for secrets (`SWIFT_USER`, `SWIFT_PASS`). Returns a fully merged AppConfig
/// or an error.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if static_conf.upload.chunk_size_mib == 0 {
        error!("upload.chunk_size_mib must be positive");
        anyhow::bail!("upload.chunk_size_mib must be positive");
    }
    if static_conf.upload.concurrency == 0 {
        error!("upload.concurrency must be at least 1");
        anyhow::bail!("upload.concurrency must be at least 1");
    }

    let user = match std::env::var("SWIFT_USER") {
        Ok(user) => {
            info!("SWIFT_USER found in env");
            user
        }
        Err(e) => {
            error!(error = ?e, "SWIFT_USER environment variable not set");
            return Err(anyhow::anyhow!("SWIFT_USER environment variable not set: {e}"));
        }
    };

    let password = match std::env::var("SWIFT_PASS") {
        Ok(password) => {
            info!("SWIFT_PASS found in env");
            password
        }
        Err(e) => {
            error!(error = ?e, "SWIFT_PASS environment variable not set");
            return Err(anyhow::anyhow!("SWIFT_PASS environment variable not set: {e}"));
        }
    };

    let auth = AuthConfig {
        auth_url: static_conf.auth.url,
        user,
        password,
        expiry: static_conf.auth.expiry,
    };

    let upload = UploadConfig {
        container: static_conf.upload.container,
        segment_container: static_conf.upload.segment_container,
        temp_dir: static_conf.upload.temp_dir,
        chunk_size_mib: static_conf.upload.chunk_size_mib,
        concurrency: static_conf.upload.concurrency,
    };

    info!(
        container = %upload.container,
        segment_container = %upload.segment_container,
        chunk_size_mib = upload.chunk_size_mib,
        "Config loaded and merged successfully"
    );

    Ok(AppConfig { auth, upload })
}
