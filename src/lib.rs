mod classify;
mod compress;
mod config;
mod error;
mod feed;
mod gz_jsonl;
mod ingest;
mod paths;
mod shard;
mod sink;
mod stats;
mod util;

mod export;
mod progress;

pub use crate::config::ArchiveOptions;
pub use crate::error::{IngestError, MalformedReason};
pub use crate::ingest::{Archiver, LoopState};
pub use crate::stats::IngestStats;

// The feed collaborator contract and the built-in line adapter.
pub use crate::feed::{Feed, FeedEvent, LineFeed, RetryPolicy};

// Classification is pure; exposed so embedders can pre-filter or test.
pub use crate::classify::{classify, Classified};

// Shard machinery and the background compressor, usable standalone.
pub use crate::compress::{compress_shard, Compressor};
pub use crate::shard::{Appended, ShardNamer, ShardWriter};
pub use crate::sink::MalformedSink;

// On-disk layout and discovery for batch tooling.
pub use crate::paths::{discover_shards, shard_paths, side_file_path, ShardFile, ShardPaths};

// Batch CSV extraction over completed shards.
pub use crate::export::{default_fields, export_csv, CsvExportOptions, FieldPath};
pub use crate::gz_jsonl::for_each_line;

// Robust file ops and logging bootstrap, for binaries embedding the engine.
pub use crate::util::{
    create_with_backoff, init_tracing_once, open_with_backoff, remove_with_backoff,
    replace_file_atomic_backoff,
};
