#[path = "common/mod.rs"]
mod common;

use common::*;
use sluice::{compress_shard, Compressor, IngestError};
use std::fs;
use std::path::PathBuf;

fn write_shard(dir: &std::path::Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

/// The round-trip law: the gz decompresses to exactly the original bytes,
/// and only then is the original removed.
#[test]
fn round_trip_then_delete_original() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..100).map(content_payload).collect();
    let shard = write_shard(dir.path(), "t1000.json", &lines);
    let original = fs::read(&shard).unwrap();

    let gz = compress_shard(&shard).unwrap();
    assert_eq!(gz, dir.path().join("t1000.json.gz"));
    assert!(!shard.exists(), "original removed after compression");
    assert_eq!(read_gz_bytes(&gz), original);
}

/// Interrupted compression must never destroy data: with the destination
/// unwritable the job fails, the original survives complete, and no partial
/// gz is left claiming to be a shard.
#[test]
fn failure_leaves_original_intact() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..10).map(content_payload).collect();
    let shard = write_shard(dir.path(), "t2000.json", &lines);
    let original = fs::read(&shard).unwrap();

    // Occupy the destination path with a directory so the gz create fails.
    fs::create_dir(dir.path().join("t2000.json.gz")).unwrap();

    let res = compress_shard(&shard);
    assert!(matches!(res, Err(IngestError::Compression { .. })));
    assert!(shard.exists(), "original must survive a failed compression");
    assert_eq!(fs::read(&shard).unwrap(), original);
}

#[test]
fn missing_source_errors() {
    let dir = tempfile::tempdir().unwrap();
    let res = compress_shard(&dir.path().join("t3000.json"));
    assert!(matches!(res, Err(IngestError::Compression { .. })));
    assert!(!dir.path().join("t3000.json.gz").exists());
}

/// Shutdown closes the queue and drains it: every submitted shard is
/// compressed before `shutdown()` returns.
#[test]
fn pool_drains_queue_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let shards: Vec<PathBuf> = (0..3)
        .map(|i| {
            let lines: Vec<String> = (0..20).map(content_payload).collect();
            write_shard(dir.path(), &format!("t{}.json", 4000 + i), &lines)
        })
        .collect();

    let pool = Compressor::spawn(2);
    for s in &shards {
        pool.submit(s.clone());
    }
    pool.shutdown();

    for s in &shards {
        assert!(!s.exists(), "{} should be removed", s.display());
        let gz = PathBuf::from(format!("{}.gz", s.display()));
        assert!(gz.exists(), "{} should exist", gz.display());
        assert!(!read_gz_lines(&gz).is_empty());
    }
}
