//! Batch CSV extraction over completed shards: a pure, stateless transform
//! run after the fact, independent of the ingestion path.
//!
//! Columns are path expressions into each record's JSON tree, comma-separated
//! per dimension (`"user,id"`, `"geo,coordinates,0"`); numeric segments index
//! arrays. Convenience time columns can be derived from a timestamp field.

use crate::gz_jsonl::for_each_line;
use crate::paths::ShardFile;
use crate::progress::{make_progress_bar_labeled, total_shard_size};
use crate::util::{create_with_backoff, init_tracing_once, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// The feed's textual timestamp layout, e.g. `Wed Aug 27 13:08:45 +0000 2008`.
/// Epoch-second numbers and RFC3339 strings are also accepted.
const FEED_TIME_LAYOUT: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute] [year]"
);

const TIME_COLUMNS: [&str; 6] = ["Year", "Month", "Day", "Hour", "Minute", "Seconds"];

#[derive(Clone, Debug)]
enum Segment {
    Key(String),
    Index(usize),
}

/// One output column: a parsed path expression plus its header name
/// (segments joined with `-`).
#[derive(Clone, Debug)]
pub struct FieldPath {
    segments: Vec<Segment>,
    header: String,
}

impl FieldPath {
    /// Parse a comma-separated path expression. Numeric segments index
    /// arrays; everything else is an object key.
    pub fn parse(expr: &str) -> Result<Self> {
        let raw: Vec<&str> = expr.split(',').map(str::trim).collect();
        if raw.iter().any(|s| s.is_empty()) {
            bail!("empty segment in field path {expr:?}");
        }
        let header = raw.join("-");
        let segments = raw
            .into_iter()
            .map(|s| match s.parse::<usize>() {
                Ok(i) => Segment::Index(i),
                Err(_) => Segment::Key(s.to_string()),
            })
            .collect();
        Ok(Self { segments, header })
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    fn extract<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut cur = root;
        for seg in &self.segments {
            cur = match seg {
                Segment::Key(k) => cur.get(k.as_str())?,
                Segment::Index(i) => cur.get(*i)?,
            };
        }
        Some(cur)
    }
}

/// Commonly wanted columns when none are configured: record and author
/// identifiers, coordinates, place name, creation time, message text.
pub fn default_fields() -> Vec<FieldPath> {
    [
        "id",
        "user,id",
        "user,screen_name",
        "geo,coordinates,0",
        "geo,coordinates,1",
        "place,full_name",
        "created_at",
        "text",
    ]
    .iter()
    .map(|e| FieldPath::parse(e).expect("default field paths parse"))
    .collect()
}

/// Exporter options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CsvExportOptions {
    pub fields: Vec<FieldPath>, // empty => default_fields()
    pub time_columns: bool,     // derive Year..Seconds from `time_field`
    pub time_field: String,
    pub file_concurrency: usize, // shards processed concurrently
    pub progress: bool,

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for CsvExportOptions {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            time_columns: true,
            time_field: "created_at".to_string(),
            file_concurrency: 1,
            progress: true,
            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl CsvExportOptions {
    pub fn with_fields(mut self, fields: Vec<FieldPath>) -> Self {
        self.fields = fields;
        self
    }
    pub fn with_field(mut self, field: FieldPath) -> Self {
        self.fields.push(field);
        self
    }
    pub fn with_time_columns(mut self, yes: bool) -> Self {
        self.time_columns = yes;
        self
    }
    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field = field.into();
        self
    }
    pub fn with_file_concurrency(mut self, n: usize) -> Self {
        self.file_concurrency = n.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
}

/// Flatten `shards` into one CSV at `out_path`. Shards are processed into
/// per-shard parts (concurrently when asked), stitched under a single header
/// row in shard-timestamp order, and promoted atomically. Returns the number
/// of records written. Lines that fail to parse as JSON are skipped; deep
/// validation belongs to downstream tooling.
pub fn export_csv(shards: &[ShardFile], out_path: &Path, opts: &CsvExportOptions) -> Result<u64> {
    init_tracing_once();

    let fields = if opts.fields.is_empty() { default_fields() } else { opts.fields.clone() };
    let time_path = if opts.time_columns {
        Some(FieldPath::parse(&opts.time_field)?)
    } else {
        None
    };

    let staging = staging_dir(out_path);
    fs::create_dir_all(&staging)
        .with_context(|| format!("create staging dir {}", staging.display()))?;

    let pb = if opts.progress && !shards.is_empty() {
        Some(make_progress_bar_labeled(total_shard_size(shards), Some("Extracting CSV")))
    } else {
        None
    };

    let total = AtomicU64::new(0);
    for_each_shard_limited(shards, opts.file_concurrency, |shard| {
        let part = staging.join(part_name(shard));
        let file = create_with_backoff(&part, 16, 50)
            .with_context(|| format!("create {}", part.display()))?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(opts.write_buffer_bytes, file));

        let mut written = 0u64;
        for_each_line(&shard.path, opts.read_buffer_bytes, |line| {
            let val: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(_) => return Ok(()),
            };
            let mut rec: Vec<String> = fields.iter().map(|f| cell_text(f.extract(&val))).collect();
            if let Some(tp) = &time_path {
                rec.extend(time_cells(tp.extract(&val)));
            }
            w.write_record(&rec)?;
            written += 1;
            Ok(())
        })?;
        w.flush()?;

        total.fetch_add(written, Ordering::Relaxed);
        if let Some(pb) = &pb {
            pb.inc(fs::metadata(&shard.path).map(|m| m.len()).unwrap_or(0));
        }
        Ok(())
    })?;
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    assemble(&staging, out_path, &fields, opts)?;
    let _ = fs::remove_dir_all(&staging);
    Ok(total.load(Ordering::Relaxed))
}

fn staging_dir(out_path: &Path) -> PathBuf {
    let name = out_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    out_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("_{name}.parts"))
}

/// Zero-padded so a lexical sort of part names matches timestamp order.
fn part_name(shard: &ShardFile) -> String {
    let kind = if shard.compressed { "gz" } else { "json" };
    format!("part_{:020}_{}.csv", shard.timestamp_ms, kind)
}

/// Limit parallelism across shards: at most `limit` readers in flight.
fn for_each_shard_limited<F>(shards: &[ShardFile], limit: usize, f: F) -> Result<()>
where
    F: Sync + Fn(&ShardFile) -> Result<()>,
{
    if limit <= 1 {
        for s in shards {
            f(s)?;
        }
        return Ok(());
    }
    for chunk in shards.chunks(limit) {
        chunk.par_iter().try_for_each(|s| f(s))?;
    }
    Ok(())
}

/// Header row first, then the parts in lexical (= timestamp) order, then an
/// atomic promote over `out_path`.
fn assemble(
    staging: &Path,
    out_path: &Path,
    fields: &[FieldPath],
    opts: &CsvExportOptions,
) -> Result<()> {
    let tmp = staging.join("assembled.inprogress");
    {
        let file = create_with_backoff(&tmp, 16, 50)
            .with_context(|| format!("create {}", tmp.display()))?;
        let mut out = BufWriter::with_capacity(opts.write_buffer_bytes, file);

        {
            let mut hw = csv::WriterBuilder::new().has_headers(false).from_writer(&mut out);
            let mut header: Vec<String> = fields.iter().map(|f| f.header().to_string()).collect();
            if opts.time_columns {
                header.extend(TIME_COLUMNS.iter().map(|s| s.to_string()));
            }
            hw.write_record(&header)?;
            hw.flush()?;
        }

        let mut parts: Vec<PathBuf> = fs::read_dir(staging)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("part_"))
            })
            .collect();
        parts.sort();
        for p in parts {
            let mut r = BufReader::new(open_with_backoff(&p, 16, 50)?);
            io::copy(&mut r, &mut out)?;
        }
        out.flush()?;
    }
    replace_file_atomic_backoff(&tmp, out_path)
}

fn cell_text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn time_cells(v: Option<&Value>) -> Vec<String> {
    match v.and_then(parse_feed_time) {
        Some(dt) => vec![
            dt.year().to_string(),
            u8::from(dt.month()).to_string(),
            dt.day().to_string(),
            dt.hour().to_string(),
            dt.minute().to_string(),
            dt.second().to_string(),
        ],
        None => vec![String::new(); 6],
    }
}

fn parse_feed_time(v: &Value) -> Option<OffsetDateTime> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()),
        Value::String(s) => OffsetDateTime::parse(s, FEED_TIME_LAYOUT)
            .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
            .ok(),
        _ => None,
    }
}
