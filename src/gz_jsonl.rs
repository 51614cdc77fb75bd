//! Streaming line reader over completed shards, plain or gzipped.

use crate::util::open_with_backoff;
use anyhow::Result;
use flate2::read::MultiGzDecoder;
use std::io::{BufRead, BufReader};
use std::path::Path;

fn warn_decode_skip(path: &Path, e: &anyhow::Error) {
    // Corruption usually trails; the batch path skips the file and continues
    // rather than aborting the whole run.
    tracing::warn!(path = %path.display(), error = %e, "skipping shard after decode error");
}

/// Stream a shard line-by-line; `on_line` gets each raw line with the
/// trailing `\r?\n` stripped. `.gz` shards are decoded transparently. A
/// decode error mid-file logs one warning and skips the rest of that file.
pub fn for_each_line(
    path: &Path,
    read_buf_bytes: usize,
    mut on_line: impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    match for_each_line_attempt(path, read_buf_bytes, &mut on_line) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn_decode_skip(path, &e);
            Ok(())
        }
    }
}

fn for_each_line_attempt(
    path: &Path,
    read_buf_bytes: usize,
    on_line: &mut impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let file = open_with_backoff(path, 16, 50)?;
    let cap = read_buf_bytes.max(8 * 1024);
    let gz = path.extension().map_or(false, |ext| ext == "gz");
    let mut reader: Box<dyn BufRead> = if gz {
        Box::new(BufReader::with_capacity(cap, MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(cap, file))
    };

    let mut buf = String::with_capacity(16 * 1024);
    loop {
        buf.clear();
        let n = reader.read_line(&mut buf)?;
        if n == 0 {
            break;
        }
        if buf.ends_with('\n') {
            let _ = buf.pop();
            if buf.ends_with('\r') {
                let _ = buf.pop();
            }
        }
        on_line(&buf)?;
    }
    Ok(())
}
