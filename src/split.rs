//! Splits a source file into bounded-size segment files on local disk.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SplitError;

/// One slice of the source file.
///
/// `temp_name` doubles as the local temp file name and the remote object name
/// the segment is uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub temp_name: String,
    /// Zero-based position in the segment sequence.
    pub index: usize,
    /// Byte offset into the source file where this segment starts.
    pub start_offset: u64,
}

impl SegmentDescriptor {
    /// Path of this segment's temp file under `temp_dir`.
    pub fn local_path(&self, temp_dir: &Path) -> PathBuf {
        temp_dir.join(&self.temp_name)
    }
}

/// Divides `source` into `ceil(len / chunk_size)` segments and writes each
/// segment's bytes to a uniquely named temp file under `temp_dir`.
///
/// All descriptors are created before any bytes move, with exact u64 offset
/// arithmetic (`index * chunk_size`, checked). Every segment is `chunk_size`
/// bytes except possibly the last, which runs to end-of-file; when the chunk
/// size divides the file length exactly there is no trailing empty segment.
/// Returns the descriptors in index order. If any segment write fails, the
/// temp files written so far are removed best-effort before the error is
/// returned.
pub fn split(
    source: &Path,
    temp_dir: &Path,
    chunk_size: u64,
) -> Result<Vec<SegmentDescriptor>, SplitError> {
    if chunk_size == 0 {
        return Err(SplitError::InvalidChunkSize);
    }
    let file_len = fs::metadata(source)?.len();
    if file_len == 0 {
        return Err(SplitError::EmptySource(source.to_path_buf()));
    }

    let segment_count = file_len.div_ceil(chunk_size);
    let mut segments = Vec::with_capacity(segment_count as usize);
    for index in 0..segment_count {
        let start_offset = index
            .checked_mul(chunk_size)
            .ok_or(SplitError::SourceTooLarge {
                file_len,
                chunk_size,
            })?;
        segments.push(SegmentDescriptor {
            temp_name: Uuid::new_v4().to_string(),
            index: index as usize,
            start_offset,
        });
    }

    fs::create_dir_all(temp_dir)?;
    if let Err(err) = write_segment_files(source, temp_dir, &segments, chunk_size) {
        remove_partial_output(temp_dir, &segments);
        return Err(err.into());
    }

    Ok(segments)
}

fn write_segment_files(
    source: &Path,
    temp_dir: &Path,
    segments: &[SegmentDescriptor],
    chunk_size: u64,
) -> io::Result<()> {
    let mut reader = File::open(source)?;
    for segment in segments {
        reader.seek(SeekFrom::Start(segment.start_offset))?;
        let mut writer = BufWriter::new(File::create(segment.local_path(temp_dir))?);
        let copied = io::copy(&mut (&mut reader).take(chunk_size), &mut writer)?;
        writer.flush()?;
        debug!(
            index = segment.index,
            offset = segment.start_offset,
            bytes = copied,
            name = %segment.temp_name,
            "wrote segment file"
        );
    }
    Ok(())
}

fn remove_partial_output(temp_dir: &Path, segments: &[SegmentDescriptor]) {
    for segment in segments {
        let path = segment.local_path(temp_dir);
        if !path.exists() {
            continue;
        }
        if let Err(err) = fs::remove_file(&path) {
            warn!(error = %err, path = %path.display(), "failed to remove partial segment file");
        }
    }
}
