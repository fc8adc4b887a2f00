use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use swift_chunker::client::MockObjectStore;
use swift_chunker::config::UploadConfig;
use swift_chunker::error::{StoreError, UploadError};
use swift_chunker::upload::split_upload;
use tempfile::tempdir;

const MIB: u64 = 1024 * 1024;

fn upload_config(temp_dir: PathBuf, chunk_size_mib: u64, concurrency: usize) -> UploadConfig {
    UploadConfig {
        container: "merged".to_string(),
        segment_container: "segments".to_string(),
        temp_dir,
        chunk_size_mib,
        concurrency,
    }
}

fn temp_dir_is_empty(temp_dir: &Path) -> bool {
    !temp_dir.exists() || fs::read_dir(temp_dir).unwrap().next().is_none()
}

#[tokio::test]
async fn ten_mib_upload_commits_three_entry_manifest_and_reclaims_segments() {
    let scratch = tempdir().unwrap();
    let temp_dir = scratch.path().join("segments");
    let source = scratch.path().join("source.bin");
    fs::write(&source, vec![7u8; (10 * MIB) as usize]).unwrap();

    let mut store = MockObjectStore::new();

    let put_sizes = Arc::new(Mutex::new(Vec::new()));
    {
        let put_sizes = put_sizes.clone();
        let mut etag_counter = 0;
        store
            .expect_put_object()
            .times(3)
            .returning(move |container, _name, body| {
                assert_eq!(container, "segments");
                put_sizes.lock().unwrap().push(body.len() as u64);
                etag_counter += 1;
                Ok(format!("etag-{etag_counter}"))
            });
    }

    let manifest_body = Arc::new(Mutex::new(String::new()));
    {
        let manifest_body = manifest_body.clone();
        store
            .expect_put_manifest()
            .times(1)
            .returning(move |container, _name, body| {
                assert_eq!(container, "merged");
                *manifest_body.lock().unwrap() = body;
                Ok(())
            });
    }

    let deleted = Arc::new(Mutex::new(Vec::new()));
    {
        let deleted = deleted.clone();
        store
            .expect_delete_object()
            .times(3)
            .returning(move |container, name| {
                assert_eq!(container, "segments");
                deleted.lock().unwrap().push(name.to_string());
                Ok(())
            });
    }

    let config = upload_config(temp_dir.clone(), 4, 1);
    let result = split_upload(&store, &config, &source)
        .await
        .expect("split upload should succeed");

    assert_eq!(result.segment_count, 3);
    assert_eq!(result.total_bytes, 10 * MIB);
    assert!(
        result.merged_name.ends_with(".bin"),
        "merged name should keep the source extension: {}",
        result.merged_name
    );

    assert_eq!(*put_sizes.lock().unwrap(), vec![4 * MIB, 4 * MIB, 2 * MIB]);

    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_body.lock().unwrap()).unwrap();
    let entries = manifest.as_array().expect("manifest body must be a JSON array");
    assert_eq!(entries.len(), 3, "exactly one entry per segment");
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry["etag"], format!("etag-{}", i + 1), "upload order preserved");
        assert!(entry["path"].as_str().unwrap().starts_with("segments/"));
    }
    assert_eq!(entries[0]["size_bytes"], 4 * MIB);
    assert_eq!(entries[1]["size_bytes"], 4 * MIB);
    assert_eq!(entries[2]["size_bytes"], 2 * MIB);

    assert_eq!(deleted.lock().unwrap().len(), 3, "one delete per segment");
    assert!(
        temp_dir_is_empty(&temp_dir),
        "all local segment temp files should be removed"
    );
}

#[tokio::test]
async fn segment_upload_failure_aborts_before_the_manifest() {
    let scratch = tempdir().unwrap();
    let temp_dir = scratch.path().join("segments");
    let source = scratch.path().join("source.bin");
    fs::write(&source, vec![1u8; (3 * MIB) as usize]).unwrap();

    let mut store = MockObjectStore::new();
    let mut calls = 0;
    store.expect_put_object().times(2).returning(move |_, _, _| {
        calls += 1;
        if calls == 1 {
            Ok("etag-1".to_string())
        } else {
            Err(StoreError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            })
        }
    });
    store.expect_put_manifest().never();
    store.expect_delete_object().never();

    let config = upload_config(temp_dir.clone(), 1, 1);
    let err = split_upload(&store, &config, &source)
        .await
        .expect_err("second segment upload should fail the run");

    assert!(matches!(err, UploadError::Segment { .. }));
    assert!(
        temp_dir_is_empty(&temp_dir),
        "local scratch is reclaimed even on failure"
    );
}

#[tokio::test]
async fn manifest_failure_keeps_remote_segments() {
    let scratch = tempdir().unwrap();
    let temp_dir = scratch.path().join("segments");
    let source = scratch.path().join("source.bin");
    fs::write(&source, vec![2u8; (2 * MIB) as usize]).unwrap();

    let mut store = MockObjectStore::new();
    let mut etag_counter = 0;
    store.expect_put_object().times(2).returning(move |_, _, _| {
        etag_counter += 1;
        Ok(format!("etag-{etag_counter}"))
    });
    store.expect_put_manifest().times(1).returning(|_, _, _| {
        Err(StoreError::Status {
            status: 500,
            body: "manifest rejected".to_string(),
        })
    });
    // Retained on purpose: a retry can re-commit the manifest from the
    // already-uploaded segments.
    store.expect_delete_object().never();

    let config = upload_config(temp_dir.clone(), 1, 1);
    let err = split_upload(&store, &config, &source)
        .await
        .expect_err("manifest failure should fail the run");

    assert!(matches!(err, UploadError::Manifest(_)));
    assert!(
        temp_dir_is_empty(&temp_dir),
        "local temp files are still removed on manifest failure"
    );
}

#[tokio::test]
async fn bounded_concurrency_preserves_manifest_order() {
    let scratch = tempdir().unwrap();
    let temp_dir = scratch.path().join("segments");
    let source = scratch.path().join("source.bin");
    // Five 1 MiB blocks, block k filled with byte k, so each segment body
    // identifies its own index.
    let mut bytes = Vec::with_capacity((5 * MIB) as usize);
    for block in 0u8..5 {
        bytes.extend(std::iter::repeat(block).take(MIB as usize));
    }
    fs::write(&source, &bytes).unwrap();

    let mut store = MockObjectStore::new();
    store
        .expect_put_object()
        .times(5)
        .returning(|_, _, body| Ok(format!("etag-{}", body[0])));

    let manifest_body = Arc::new(Mutex::new(String::new()));
    {
        let manifest_body = manifest_body.clone();
        store
            .expect_put_manifest()
            .times(1)
            .returning(move |_, _, body| {
                *manifest_body.lock().unwrap() = body;
                Ok(())
            });
    }
    store.expect_delete_object().times(5).returning(|_, _| Ok(()));

    let config = upload_config(temp_dir.clone(), 1, 4);
    let result = split_upload(&store, &config, &source)
        .await
        .expect("concurrent split upload should succeed");

    assert_eq!(result.segment_count, 5);
    assert_eq!(result.total_bytes, 5 * MIB);

    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_body.lock().unwrap()).unwrap();
    let etags: Vec<&str> = manifest
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["etag"].as_str().unwrap())
        .collect();
    assert_eq!(
        etags,
        vec!["etag-0", "etag-1", "etag-2", "etag-3", "etag-4"],
        "manifest entries must stay in segment index order"
    );
}

#[tokio::test]
async fn segment_delete_failures_do_not_fail_a_committed_upload() {
    let scratch = tempdir().unwrap();
    let temp_dir = scratch.path().join("segments");
    let source = scratch.path().join("source.bin");
    fs::write(&source, vec![3u8; (2 * MIB) as usize]).unwrap();

    let mut store = MockObjectStore::new();
    let mut etag_counter = 0;
    store.expect_put_object().times(2).returning(move |_, _, _| {
        etag_counter += 1;
        Ok(format!("etag-{etag_counter}"))
    });
    store
        .expect_put_manifest()
        .times(1)
        .returning(|_, _, _| Ok(()));
    store.expect_delete_object().times(2).returning(|_, _| {
        Err(StoreError::Status {
            status: 500,
            body: "delete failed".to_string(),
        })
    });

    let config = upload_config(temp_dir.clone(), 1, 1);
    let result = split_upload(&store, &config, &source)
        .await
        .expect("delete failures during cleanup must not fail the upload");

    assert_eq!(result.segment_count, 2);
    assert!(temp_dir_is_empty(&temp_dir));
}

#[tokio::test]
async fn empty_source_fails_without_touching_the_store() {
    let scratch = tempdir().unwrap();
    let temp_dir = scratch.path().join("segments");
    let source = scratch.path().join("empty.bin");
    fs::write(&source, b"").unwrap();

    let mut store = MockObjectStore::new();
    store.expect_put_object().never();
    store.expect_put_manifest().never();
    store.expect_delete_object().never();

    let config = upload_config(temp_dir, 1, 1);
    let err = split_upload(&store, &config, &source)
        .await
        .expect_err("empty source should fail the run");

    assert!(matches!(err, UploadError::Split(_)));
}
