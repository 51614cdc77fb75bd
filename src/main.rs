use anyhow::Result;
use sluice::{ArchiveOptions, Archiver, LineFeed};
use std::fs;
use std::io;

const DATA_DIR: &str = "./data";

/// Archive an NDJSON feed from stdin into timestamped, gzip-compacted
/// shards. Pipe the upstream connector into this binary:
///
///   feed-connector | sluice [data_dir]
fn main() -> Result<()> {
    let data_dir = std::env::args().nth(1).unwrap_or_else(|| DATA_DIR.to_string());
    fs::create_dir_all(&data_dir)?;

    let opts = ArchiveOptions::default().with_data_dir(&data_dir);
    let archiver = Archiver::new(opts);

    let stdin = io::stdin();
    let mut feed = LineFeed::new(stdin.lock());
    let stats = archiver.run(&mut feed)?;

    println!("{}", stats.summary());
    Ok(())
}
