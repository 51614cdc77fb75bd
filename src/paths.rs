//! On-disk layout: shard and side-file naming, and discovery of completed
//! shards for batch tooling.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File path pair derived from one shard identifier: the raw shard and the
/// sibling reserved for downstream CSV extraction.
#[derive(Clone, Debug)]
pub struct ShardPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

pub fn shard_paths(dir: &Path, timestamp_ms: u64) -> ShardPaths {
    ShardPaths {
        json: dir.join(format!("t{timestamp_ms}.json")),
        csv: dir.join(format!("t{timestamp_ms}.csv")),
    }
}

/// Side file for one malformed payload: `error<timestamp-ms>.json`.
pub fn side_file_path(dir: &Path, timestamp_ms: u64) -> PathBuf {
    dir.join(format!("error{timestamp_ms}.json"))
}

/// A completed shard discovered on disk, plain or already compressed.
#[derive(Clone, Debug)]
pub struct ShardFile {
    pub timestamp_ms: u64,
    pub path: PathBuf,
    pub compressed: bool,
}

/// Scan `dir` (non-recursively) for `t<ts>.json` / `t<ts>.json.gz`, ordered
/// by the timestamp embedded in the name. Missing directory yields an empty
/// list.
pub fn discover_shards(dir: &Path) -> Vec<ShardFile> {
    let re = Regex::new(r"^t(\d+)\.json(\.gz)?$").unwrap();
    let mut map = BTreeMap::new();
    if !dir.exists() {
        return Vec::new();
    }
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        if let Ok(ent) = entry {
            if let Some(name) = ent.file_name().to_str() {
                if let Some(caps) = re.captures(name) {
                    if let Ok(ts) = caps[1].parse::<u64>() {
                        let compressed = caps.get(2).is_some();
                        map.insert(
                            (ts, compressed),
                            ShardFile {
                                timestamp_ms: ts,
                                path: ent.path().to_path_buf(),
                                compressed,
                            },
                        );
                    }
                }
            }
        }
    }
    map.into_values().collect()
}
