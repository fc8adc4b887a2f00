use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::auth::Authenticator;
use crate::client::SwiftClient;
use crate::load_config::load_config;
use crate::upload::split_upload;

/// CLI for swift-chunker: push large files into a Swift-style store as
/// manifest-backed chunked objects.
#[derive(Parser)]
#[clap(
    name = "swift-chunker",
    version,
    about = "Split large files into segments and commit them as one manifest-backed object"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split the file into segments, upload them and commit the manifest
    SplitUpload {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Source file to upload
        #[clap(long)]
        file: PathBuf,
    },
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::SplitUpload { config, file } => {
            let config = load_config(config)?;
            config.trace_loaded();

            let http = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?;
            let auth = Arc::new(Authenticator::new(http.clone(), config.auth.clone()));
            let client = SwiftClient::new(http, auth);

            println!("Split upload starting...");
            match split_upload(&client, &config.upload, &file).await {
                Ok(result) => {
                    println!("Split upload complete.\nReport:");
                    println!("{:#?}", result);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Split upload failed: {e}");
                    Err(e.into())
                }
            }
        }
    }
}
