#![allow(dead_code)]

use flate2::read::MultiGzDecoder;
use serde_json::json;
use sluice::{Feed, FeedEvent, IngestError};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// A feed that replays a programmed sequence of events, then ends.
/// `resume()` always succeeds, so an `Error` event models a transient
/// disconnect with delivery continuing right after.
pub struct ScriptedFeed {
    events: VecDeque<FeedEvent>,
}

impl ScriptedFeed {
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self { events: events.into() }
    }

    pub fn payloads<I, S>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(iter.into_iter().map(|s| FeedEvent::Payload(s.into())).collect())
    }
}

impl Feed for ScriptedFeed {
    fn next(&mut self) -> FeedEvent {
        self.events.pop_front().unwrap_or(FeedEvent::EndOfStream)
    }

    fn resume(&mut self) -> Result<(), IngestError> {
        Ok(())
    }
}

/// A content record the classifier will accept (has an `id`).
pub fn content_payload(id: u64) -> String {
    json!({
        "id": id,
        "text": format!("record {id}"),
        "created_at": 1_136_073_600 + id
    })
    .to_string()
}

/// A deletion notice: no `id`, carries the control marker.
pub fn delete_payload(id: u64) -> String {
    json!({"delete": {"status": {"id": id}}}).to_string()
}

/// Read a plain text file line-by-line, skipping empty lines.
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    BufReader::new(f)
        .lines()
        .map(|l| l.unwrap())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Read a gzipped file line-by-line, skipping empty lines.
pub fn read_gz_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    BufReader::new(MultiGzDecoder::new(f))
        .lines()
        .map(|l| l.unwrap())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Decompress a gzipped file fully.
pub fn read_gz_bytes(path: &Path) -> Vec<u8> {
    let f = File::open(path).unwrap();
    let mut buf = Vec::new();
    MultiGzDecoder::new(f).read_to_end(&mut buf).unwrap();
    buf
}

/// Write a gzipped shard containing the provided JSONL lines.
pub fn write_gz_lines(path: &Path, lines: &[String]) {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let f = File::create(path).unwrap();
    let mut enc = GzEncoder::new(f, Compression::default());
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

fn entries_with(dir: &Path, prefix: &str, suffix: &str) -> Vec<PathBuf> {
    let mut v: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(prefix) && n.ends_with(suffix))
        })
        .collect();
    v.sort();
    v
}

/// Uncompressed shard files in `dir`, sorted by name (= by timestamp).
pub fn raw_shards(dir: &Path) -> Vec<PathBuf> {
    entries_with(dir, "t", ".json")
}

/// Compressed shard files in `dir`, sorted by name.
pub fn gz_shards(dir: &Path) -> Vec<PathBuf> {
    entries_with(dir, "t", ".json.gz")
}

/// Malformed-payload side files in `dir`, sorted by name.
pub fn side_files(dir: &Path) -> Vec<PathBuf> {
    entries_with(dir, "error", ".json")
}
