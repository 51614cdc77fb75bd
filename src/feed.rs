//! The feed collaborator contract, the loop's retry policy, and a
//! line-oriented adapter for local readers.

use crate::error::IngestError;
use std::io::BufRead;
use std::time::Duration;

/// One step of feed delivery.
#[derive(Debug)]
pub enum FeedEvent {
    /// A raw payload; ownership passes to the caller.
    Payload(String),
    /// Orderly end of delivery.
    EndOfStream,
    /// Transient feed-side failure; the caller may ask to resume.
    Error(String),
}

/// Contract with the upstream feed. Authentication, transport reconnects,
/// and message framing all live on the far side of this trait.
pub trait Feed {
    /// Deliver the next event. This is the ingestion loop's sole suspension
    /// point; implementations may block here.
    fn next(&mut self) -> FeedEvent;

    /// Re-establish delivery after an `Error` event.
    fn resume(&mut self) -> Result<(), IngestError>;
}

/// How the loop reacts to feed errors: how many resume attempts to make and
/// how long to back off between them. `max_attempts: None` retries forever,
/// which matches a long-lived collector; bound it for batch-style runs.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub backoff_start: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff_start: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32) -> Self {
        Self { max_attempts: Some(max_attempts), ..Self::default() }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_backoff(mut self, start: Duration, cap: Duration) -> Self {
        self.backoff_start = start;
        self.backoff_cap = cap.max(start);
        self
    }

    /// Zero-delay variant, for tests and in-process feeds.
    pub fn no_backoff(mut self) -> Self {
        self.backoff_start = Duration::ZERO;
        self.backoff_cap = Duration::ZERO;
        self
    }

    /// Linear ramp: `start * attempt`, clamped to the cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_start
            .saturating_mul(attempt.max(1))
            .min(self.backoff_cap)
    }

    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(false, |max| attempts >= max)
    }
}

/// Adapts any buffered reader into the feed contract, one payload per line.
/// Blank lines are skipped; trailing `\r?\n` is stripped.
pub struct LineFeed<R: BufRead> {
    rdr: R,
    buf: String,
    done: bool,
}

impl<R: BufRead> LineFeed<R> {
    pub fn new(rdr: R) -> Self {
        Self { rdr, buf: String::with_capacity(16 * 1024), done: false }
    }
}

impl<R: BufRead> Feed for LineFeed<R> {
    fn next(&mut self) -> FeedEvent {
        if self.done {
            return FeedEvent::EndOfStream;
        }
        loop {
            self.buf.clear();
            match self.rdr.read_line(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return FeedEvent::EndOfStream;
                }
                Ok(_) => {
                    if self.buf.ends_with('\n') {
                        self.buf.pop();
                        if self.buf.ends_with('\r') {
                            self.buf.pop();
                        }
                    }
                    if self.buf.is_empty() {
                        continue;
                    }
                    return FeedEvent::Payload(self.buf.clone());
                }
                Err(e) => return FeedEvent::Error(e.to_string()),
            }
        }
    }

    /// A local reader has no session to re-establish.
    fn resume(&mut self) -> Result<(), IngestError> {
        Ok(())
    }
}
