//! Manifest body for `multipart-manifest=put` commits.

use serde::{Deserialize, Serialize};

/// One constituent object of a merged logical object.
///
/// The store concatenates constituents in entry order on read, so the order of
/// a `ManifestEntry` sequence is part of its meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// `<segment container>/<object name>` of the uploaded segment.
    pub path: String,

    /// Etag the store returned when the segment was uploaded.
    pub etag: String,

    /// Segment length in bytes.
    pub size_bytes: u64,
}

/// Serializes the entries, in the order given, to the JSON array the store
/// expects as a manifest body. Deterministic for a given entry sequence.
pub fn manifest_json(entries: &[ManifestEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string(entries)
}
