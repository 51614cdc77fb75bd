//! Background compression of closed shards.
//!
//! Ordering invariant: the uncompressed original survives until the
//! compressed copy is fully written, so a crash mid-compression never
//! destroys data.

use crate::error::IngestError;
use crate::util::{create_with_backoff, open_with_backoff, remove_with_backoff};
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

fn gz_sibling(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".gz");
    PathBuf::from(os)
}

fn write_gz(src: &Path, dst: &Path) -> io::Result<()> {
    let input = open_with_backoff(src, 16, 50)?;
    let out = create_with_backoff(dst, 16, 50)?;
    let mut enc = GzEncoder::new(BufWriter::with_capacity(256 * 1024, out), Compression::default());
    io::copy(&mut BufReader::with_capacity(256 * 1024, input), &mut enc)?;
    let mut w = enc.finish()?;
    w.flush()?;
    Ok(())
}

/// Compress `path` to `<path>.gz`, then remove the original. Only after the
/// compressed file is fully written does the original go away; on any
/// failure the original is left untouched and the partial `.gz` discarded.
pub fn compress_shard(path: &Path) -> Result<PathBuf, IngestError> {
    let gz_path = gz_sibling(path);
    match write_gz(path, &gz_path) {
        Ok(()) => {
            remove_with_backoff(path, 16, 50)
                .map_err(|e| IngestError::compression(path, e))?;
            Ok(gz_path)
        }
        Err(e) => {
            let _ = fs::remove_file(&gz_path);
            Err(IngestError::compression(path, e))
        }
    }
}

/// Fixed pool of background workers, one closed shard per job. Out-of-band
/// from the ingestion path: submission never waits on compression.
///
/// `shutdown()` closes the queue; workers drain whatever is still queued and
/// exit, so an in-flight job is never killed mid-write.
pub struct Compressor {
    tx: Option<Sender<PathBuf>>,
    workers: Vec<JoinHandle<()>>,
}

impl Compressor {
    pub fn spawn(workers: usize) -> Self {
        let (tx, rx) = channel::<PathBuf>();
        let rx = Arc::new(Mutex::new(rx));
        let workers = (0..workers.max(1))
            .map(|i| {
                let rx = Arc::clone(&rx);
                thread::Builder::new()
                    .name(format!("compress-{i}"))
                    .spawn(move || loop {
                        let job = rx.lock().recv();
                        let shard = match job {
                            Ok(p) => p,
                            Err(_) => break, // queue closed and drained
                        };
                        match compress_shard(&shard) {
                            Ok(gz) => tracing::info!(
                                shard = %shard.display(),
                                gz = %gz.display(),
                                "compressed closed shard"
                            ),
                            Err(e) => tracing::warn!(
                                shard = %shard.display(),
                                error = %e,
                                "compression failed; original left in place"
                            ),
                        }
                    })
                    .expect("spawn compression worker")
            })
            .collect();
        Self { tx: Some(tx), workers }
    }

    /// Queue one closed shard. Fire-and-forget from the writer's view.
    pub fn submit(&self, shard: PathBuf) {
        if let Some(tx) = &self.tx {
            if tx.send(shard).is_err() {
                tracing::warn!("compression queue closed; shard left uncompressed");
            }
        }
    }

    /// Close the queue, let workers drain it, and join them.
    pub fn shutdown(mut self) {
        self.drain_and_join();
    }

    fn drain_and_join(&mut self) {
        self.tx.take();
        for h in self.workers.drain(..) {
            let _ = h.join();
        }
    }
}

impl Drop for Compressor {
    fn drop(&mut self) {
        self.drain_and_join();
    }
}
