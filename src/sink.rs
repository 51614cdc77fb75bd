//! Quarantine for malformed payloads: each one lands in its own timestamped
//! side file, kept out of content shards so it is never lost and never
//! mistaken for a record.

use crate::error::IngestError;
use crate::paths::side_file_path;
use crate::shard::MonotonicMillis;
use crate::util::create_with_backoff;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct MalformedSink {
    dir: PathBuf,
    clock: MonotonicMillis,
}

impl MalformedSink {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf(), clock: MonotonicMillis::default() }
    }

    /// Write the raw payload to `error<timestamp-ms>.json`; returns the path.
    /// The monotonic clock keeps two events in the same millisecond from
    /// clobbering each other.
    pub fn write(&mut self, raw: &str) -> Result<PathBuf, IngestError> {
        let path = side_file_path(&self.dir, self.clock.next());
        let mut f = create_with_backoff(&path, 16, 50)
            .map_err(|e| IngestError::storage(path.clone(), e))?;
        f.write_all(raw.as_bytes())
            .and_then(|_| f.write_all(b"\n"))
            .map_err(|e| IngestError::storage(path.clone(), e))?;
        Ok(path)
    }
}
