use std::path::{Path, PathBuf};

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct ArchiveOptions {
    pub data_dir: PathBuf,            // destination directory; must pre-exist
    pub shard_capacity: u64,          // records before rotation
    pub compress: bool,               // background compression of closed shards
    pub compression_workers: usize,   // pool size when compression is on
    pub control_log_every: Option<u64>, // None => shard_capacity / 100
    pub malformed_reason_cap: usize,  // distinct reason keys kept in the tally

    // IO tuning
    pub read_buffer_bytes: usize,     // BufReader capacity
    pub write_buffer_bytes: usize,    // BufWriter capacity
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        // Defaults chosen to be safe but noticeably faster than std defaults.
        // Adjust at runtime via the io_* builder methods.
        let default_read = 256 * 1024;
        let default_write = 256 * 1024;

        Self {
            data_dir: PathBuf::from("./data"),
            shard_capacity: 500_000,
            compress: true,
            compression_workers: 2,
            control_log_every: None,
            malformed_reason_cap: 64,

            read_buffer_bytes: default_read,
            write_buffer_bytes: default_write,
        }
    }
}

impl ArchiveOptions {
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_shard_capacity(mut self, records: u64) -> Self {
        self.shard_capacity = records.max(1);
        self
    }
    pub fn with_compress(mut self, yes: bool) -> Self {
        self.compress = yes;
        self
    }
    pub fn with_compression_workers(mut self, n: usize) -> Self {
        self.compression_workers = n.max(1);
        self
    }
    pub fn with_control_log_every(mut self, every: u64) -> Self {
        self.control_log_every = Some(every.max(1));
        self
    }
    pub fn with_malformed_reason_cap(mut self, cap: usize) -> Self {
        self.malformed_reason_cap = cap.max(1);
        self
    }

    // IO buffers tuning
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_io_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }

    /// How often (in control messages) to emit the control-volume summary.
    pub fn control_summary_period(&self) -> u64 {
        self.control_log_every
            .unwrap_or_else(|| (self.shard_capacity / 100).max(1))
    }
}
