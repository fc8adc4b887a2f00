//! High-level pipeline: split → segment uploads → manifest commit → reclaim.
//!
//! This module drives one chunked upload end to end:
//!   - Splits the source file into segment temp files ([`crate::split`])
//!   - Uploads each segment to the segment container via [`ObjectStore`]
//!   - Commits an ordered manifest under a timestamp-derived object name
//!   - Deletes the uploaded segments and local temp files afterwards
//!
//! # Failure behaviour
//! - A segment upload failure aborts before the manifest is attempted. Already
//!   uploaded segments are not rolled back; local temp files are reclaimed.
//! - A manifest commit failure keeps the uploaded segments in place so a retry
//!   can re-commit from them; local temp files are reclaimed.
//! - Cleanup failures (one segment delete, one temp file remove) are logged
//!   and never fail an otherwise successful run.
//!
//! # Concurrency
//! [`upload_segment`] is the per-segment unit. The default drive is a
//! sequential loop; `concurrency > 1` pushes the same unit through an
//! order-preserving bounded stream, so the manifest stays in segment index
//! order no matter which uploads finish first.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, error, info, warn};

use crate::client::ObjectStore;
use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::manifest::{manifest_json, ManifestEntry};
use crate::split::{split, SegmentDescriptor};

/// Outcome of a successful split upload.
#[derive(Debug)]
pub struct UploadResult {
    /// Name of the merged logical object in the main container.
    pub merged_name: String,
    pub segment_count: usize,
    pub total_bytes: u64,
}

/// Splits `source` into segments, uploads them and commits the manifest.
pub async fn split_upload<S>(
    store: &S,
    config: &UploadConfig,
    source: &Path,
) -> Result<UploadResult, UploadError>
where
    S: ObjectStore,
{
    let merged_name = merged_object_name(source, epoch_millis());
    info!(
        source = %source.display(),
        merged_name = %merged_name,
        "starting split upload"
    );

    let segments = split(source, &config.temp_dir, config.chunk_size_bytes())?;
    info!(segments = segments.len(), "source split into segment files");

    let entries = match upload_segments(store, config, &segments).await {
        Ok(entries) => entries,
        Err(err) => {
            error!(error = %err, "segment upload failed, aborting before manifest");
            // Uploaded segments stay behind; only local scratch is reclaimed.
            remove_temp_files(&config.temp_dir, &segments);
            return Err(err);
        }
    };

    let body = manifest_json(&entries)?;
    debug!(bytes = body.len(), entries = entries.len(), "manifest body assembled");

    if let Err(err) = store.put_manifest(&config.container, &merged_name, body).await {
        error!(
            error = %err,
            merged_name = %merged_name,
            "manifest commit failed, keeping uploaded segments for retry"
        );
        remove_temp_files(&config.temp_dir, &segments);
        return Err(UploadError::Manifest(err));
    }
    info!(merged_name = %merged_name, "manifest committed");

    delete_remote_segments(store, &config.segment_container, &segments).await;
    remove_temp_files(&config.temp_dir, &segments);

    let total_bytes = entries.iter().map(|entry| entry.size_bytes).sum();
    Ok(UploadResult {
        merged_name,
        segment_count: entries.len(),
        total_bytes,
    })
}

/// Uploads one segment file and returns its manifest entry.
///
/// Callable on its own so every driver (sequential loop, bounded stream)
/// shares the exact same per-segment behaviour.
pub async fn upload_segment<S>(
    store: &S,
    config: &UploadConfig,
    segment: &SegmentDescriptor,
) -> Result<ManifestEntry, UploadError>
where
    S: ObjectStore,
{
    let path = segment.local_path(&config.temp_dir);
    let bytes = fs::read(&path).map_err(|source| UploadError::SegmentRead {
        name: segment.temp_name.clone(),
        source,
    })?;
    let size_bytes = bytes.len() as u64;
    debug!(
        index = segment.index,
        name = %segment.temp_name,
        bytes = size_bytes,
        "uploading segment"
    );

    let etag = store
        .put_object(&config.segment_container, &segment.temp_name, bytes)
        .await
        .map_err(|source| UploadError::Segment {
            name: segment.temp_name.clone(),
            source,
        })?;

    Ok(ManifestEntry {
        path: format!("{}/{}", config.segment_container, segment.temp_name),
        etag,
        size_bytes,
    })
}

async fn upload_segments<S>(
    store: &S,
    config: &UploadConfig,
    segments: &[SegmentDescriptor],
) -> Result<Vec<ManifestEntry>, UploadError>
where
    S: ObjectStore,
{
    if config.concurrency <= 1 {
        let mut entries = Vec::with_capacity(segments.len());
        for segment in segments {
            entries.push(upload_segment(store, config, segment).await?);
        }
        return Ok(entries);
    }

    // `buffered` yields results in stream order, so the manifest stays in
    // segment index order; the first error drops the unstarted uploads.
    stream::iter(
        segments
            .iter()
            .map(|segment| upload_segment(store, config, segment)),
    )
    .buffered(config.concurrency)
    .try_collect()
    .await
}

async fn delete_remote_segments<S>(
    store: &S,
    segment_container: &str,
    segments: &[SegmentDescriptor],
) where
    S: ObjectStore,
{
    for segment in segments {
        if let Err(err) = store.delete_object(segment_container, &segment.temp_name).await {
            warn!(
                error = %err,
                name = %segment.temp_name,
                "failed to delete uploaded segment, leaving it behind"
            );
        }
    }
}

fn remove_temp_files(temp_dir: &Path, segments: &[SegmentDescriptor]) {
    for segment in segments {
        let path = segment.local_path(temp_dir);
        if let Err(err) = fs::remove_file(&path) {
            warn!(error = %err, path = %path.display(), "failed to remove segment temp file");
        }
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

/// `<epoch millis><original extension>`, keeping the extension's dot; a source
/// without an extension yields the bare timestamp.
fn merged_object_name(source: &Path, timestamp_millis: u128) -> String {
    match source.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{timestamp_millis}.{ext}"),
        None => timestamp_millis.to_string(),
    }
}
