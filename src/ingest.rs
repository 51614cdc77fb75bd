//! The ingestion loop: feed → classify → {shard writer → compressor} | sink.

use crate::classify::{classify, Classified};
use crate::compress::Compressor;
use crate::config::ArchiveOptions;
use crate::error::IngestError;
use crate::feed::{Feed, FeedEvent, RetryPolicy};
use crate::shard::{Appended, ShardWriter};
use crate::sink::MalformedSink;
use crate::stats::IngestStats;
use crate::util::init_tracing_once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle states of the loop. `Streaming` is where it lives; the sole
/// suspension point is `feed.next()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Connecting,
    Streaming,
    Disconnected,
    Stopped,
}

/// Owns one ingestion run: a single-threaded intake path plus the background
/// compression pool. Construct, optionally install a retry policy, then
/// `run` a feed to completion.
pub struct Archiver {
    opts: ArchiveOptions,
    retry: RetryPolicy,
    shutdown: Arc<AtomicBool>,
}

impl Archiver {
    pub fn new(opts: ArchiveOptions) -> Self {
        Self { opts, retry: RetryPolicy::default(), shutdown: Arc::new(AtomicBool::new(false)) }
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Checked once per feed event. Set it from another thread to stop
    /// intake; the active shard is flushed and closed, and queued
    /// compression jobs are drained before `run` returns.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Drive the loop until end-of-stream, shutdown, retry exhaustion, or a
    /// fatal storage failure. Returns the final counters.
    pub fn run<F: Feed>(&self, feed: &mut F) -> Result<IngestStats, IngestError> {
        init_tracing_once();

        let mut stats = IngestStats::new(self.opts.malformed_reason_cap);
        let mut writer = ShardWriter::open(
            &self.opts.data_dir,
            self.opts.shard_capacity,
            self.opts.write_buffer_bytes,
        )?;
        let mut sink = MalformedSink::new(&self.opts.data_dir);
        let compressor = if self.opts.compress {
            Some(Compressor::spawn(self.opts.compression_workers))
        } else {
            None
        };
        let control_every = self.opts.control_summary_period();

        tracing::info!(
            data_dir = %self.opts.data_dir.display(),
            shard_capacity = self.opts.shard_capacity,
            compress = self.opts.compress,
            first_shard = %writer.active_paths().json.display(),
            "ingestion starting"
        );

        let mut state = LoopState::Connecting;
        let mut attempts: u32 = 0;
        let mut last_feed_err = String::new();

        let outcome = loop {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::info!("shutdown requested; stopping intake");
                break Ok(());
            }
            match state {
                LoopState::Connecting => {
                    tracing::debug!("feed delivering; streaming");
                    state = LoopState::Streaming;
                }
                LoopState::Streaming => match feed.next() {
                    FeedEvent::Payload(raw) => {
                        attempts = 0;
                        if let Err(e) = self.dispatch(
                            &raw,
                            &mut writer,
                            &mut sink,
                            &mut stats,
                            compressor.as_ref(),
                            control_every,
                        ) {
                            break Err(e);
                        }
                    }
                    FeedEvent::EndOfStream => {
                        tracing::info!("feed ended");
                        break Ok(());
                    }
                    FeedEvent::Error(msg) => {
                        tracing::warn!(error = %msg, "feed error; disconnected");
                        last_feed_err = msg;
                        state = LoopState::Disconnected;
                    }
                },
                LoopState::Disconnected => {
                    if self.retry.exhausted(attempts) {
                        break Err(IngestError::Feed(format!(
                            "resume attempts exhausted after {attempts}: {last_feed_err}"
                        )));
                    }
                    attempts += 1;
                    let delay = self.retry.delay_for(attempts);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    match feed.resume() {
                        Ok(()) => {
                            tracing::info!(attempt = attempts, "feed resumed");
                            state = LoopState::Connecting;
                        }
                        Err(e) => {
                            tracing::warn!(attempt = attempts, error = %e, "resume failed");
                        }
                    }
                }
                LoopState::Stopped => break Ok(()),
            }
        };

        // Stopped: flush and close the active shard (never compressed here),
        // then let the pool drain its queue.
        state = LoopState::Stopped;
        let closed = writer.close();
        if let Some(pool) = compressor {
            pool.shutdown();
        }
        tracing::info!(state = ?state, "{}", stats.summary());

        outcome.and(closed).map(|_| stats)
    }

    fn dispatch(
        &self,
        raw: &str,
        writer: &mut ShardWriter,
        sink: &mut MalformedSink,
        stats: &mut IngestStats,
        compressor: Option<&Compressor>,
        control_every: u64,
    ) -> Result<(), IngestError> {
        match classify(raw) {
            Classified::Content { .. } => {
                let appended = match writer.append(raw) {
                    Ok(a) => a,
                    Err(e) => {
                        // Best effort: the record that hit the write failure
                        // still lands somewhere before the loop dies.
                        match sink.write(raw) {
                            Ok(path) => tracing::error!(
                                record = %path.display(),
                                "shard write failed; record preserved in side file"
                            ),
                            Err(_) => tracing::error!(
                                "shard write failed; side file write also failed"
                            ),
                        }
                        return Err(e);
                    }
                };
                match appended {
                    Appended::Open { .. } => {}
                    Appended::Rotated { closed, records } => {
                        stats.shards_closed += 1;
                        tracing::info!(
                            closed = %closed.display(),
                            records,
                            next = %writer.active_paths().json.display(),
                            "rotated shard; {}",
                            stats.summary()
                        );
                        match compressor {
                            Some(pool) => pool.submit(closed),
                            None => tracing::debug!("compression disabled; shard left as-is"),
                        }
                    }
                }
                stats.note_content();
            }
            Classified::Control => {
                let seen = stats.note_control();
                if seen % control_every == 0 {
                    tracing::info!(control = seen, "control messages so far (not persisted)");
                }
            }
            Classified::Malformed { reason, detail } => {
                stats.note_malformed(&detail);
                let path = sink.write(raw)?;
                tracing::warn!(
                    reason = %reason,
                    detail = %detail,
                    side_file = %path.display(),
                    "quarantined malformed payload"
                );
            }
        }
        Ok(())
    }
}
