//! Shard naming, the active shard writer, and rotation.

use crate::error::IngestError;
use crate::paths::{shard_paths, ShardPaths};
use crate::util::create_with_backoff;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds with a monotonic tie-break: two calls in the same
/// millisecond still yield strictly increasing values.
#[derive(Debug, Default)]
pub(crate) struct MonotonicMillis {
    last: u64,
}

impl MonotonicMillis {
    pub(crate) fn next(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let ts = now.max(self.last + 1);
        self.last = ts;
        ts
    }
}

/// Maps the rotation sequence and current time to the next shard identifier.
/// Identifiers are totally ordered, so shard files sort by creation.
#[derive(Debug)]
pub struct ShardNamer {
    dir: PathBuf,
    clock: MonotonicMillis,
}

impl ShardNamer {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf(), clock: MonotonicMillis::default() }
    }

    /// The next shard's path pair (raw shard + reserved CSV sibling).
    pub fn next(&mut self) -> ShardPaths {
        shard_paths(&self.dir, self.clock.next())
    }
}

/// Result of one append: either the shard is still open, or it just rotated
/// and the closed file is ready for compression.
#[derive(Debug)]
pub enum Appended {
    Open { records: u64 },
    Rotated { closed: PathBuf, records: u64 },
}

struct ActiveShard {
    paths: ShardPaths,
    w: BufWriter<File>,
    records: u64,
}

/// Appends raw payloads to the single active shard and rotates at capacity.
///
/// Invariants: at most one shard accepts writes; a rotated-out shard is never
/// written again; no shard ever holds more than `capacity` records.
pub struct ShardWriter {
    capacity: u64,
    write_buf: usize,
    namer: ShardNamer,
    active: ActiveShard,
}

impl ShardWriter {
    /// Opens the first shard immediately. `dir` must pre-exist.
    pub fn open(dir: &Path, capacity: u64, write_buf: usize) -> Result<Self, IngestError> {
        let write_buf = write_buf.max(8 * 1024);
        let mut namer = ShardNamer::new(dir);
        let active = open_shard(&mut namer, write_buf)?;
        Ok(Self { capacity: capacity.max(1), write_buf, namer, active })
    }

    /// Path pair of the shard currently accepting writes.
    pub fn active_paths(&self) -> &ShardPaths {
        &self.active.paths
    }

    /// Records written to the active shard so far. Always `<= capacity`.
    pub fn active_records(&self) -> u64 {
        self.active.records
    }

    /// Append one raw payload as a line. When the post-write count reaches
    /// capacity the shard rotates synchronously, before the next record is
    /// accepted, and the closed file comes back to the caller.
    pub fn append(&mut self, payload: &str) -> Result<Appended, IngestError> {
        let ActiveShard { paths, w, records } = &mut self.active;
        w.write_all(payload.as_bytes())
            .and_then(|_| w.write_all(b"\n"))
            .map_err(|e| IngestError::storage(paths.json.clone(), e))?;
        *records += 1;

        if *records >= self.capacity {
            let closed = self.rotate()?;
            return Ok(Appended::Rotated { closed, records: self.capacity });
        }
        Ok(Appended::Open { records: self.active.records })
    }

    /// Close the active shard and open its successor. The full shard is
    /// flushed before the successor's identifier is computed; its file
    /// handle is released when the swap completes.
    fn rotate(&mut self) -> Result<PathBuf, IngestError> {
        self.active
            .w
            .flush()
            .map_err(|e| IngestError::storage(self.active.paths.json.clone(), e))?;
        let next = open_shard(&mut self.namer, self.write_buf)?;
        let old = std::mem::replace(&mut self.active, next);
        Ok(old.paths.json)
    }

    /// Flush and close the active shard. An empty active shard (nothing was
    /// written since the last rotation) is removed instead of left behind;
    /// `None` is returned in that case.
    pub fn close(self) -> Result<Option<PathBuf>, IngestError> {
        let ActiveShard { paths, mut w, records } = self.active;
        w.flush()
            .map_err(|e| IngestError::storage(paths.json.clone(), e))?;
        drop(w);
        if records == 0 {
            let _ = crate::util::remove_with_backoff(&paths.json, 4, 25);
            return Ok(None);
        }
        Ok(Some(paths.json))
    }
}

fn open_shard(namer: &mut ShardNamer, write_buf: usize) -> Result<ActiveShard, IngestError> {
    let paths = namer.next();
    let f = create_with_backoff(&paths.json, 16, 50)
        .map_err(|e| IngestError::storage(paths.json.clone(), e))?;
    Ok(ActiveShard { paths, w: BufWriter::with_capacity(write_buf, f), records: 0 })
}
