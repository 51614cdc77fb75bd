//! Ingestion counters: an explicit stats object owned by the loop and
//! returned to the caller, not ambient globals.

use std::collections::BTreeMap;

/// Monotonic counts for one ingestion run. The accounting law the engine
/// maintains: `content + control + malformed == total payloads seen`.
///
/// The malformed tally is keyed by reason detail and capped: past
/// `reason_cap` distinct keys, further reasons land in an overflow bucket so
/// high-cardinality error text can't grow memory without bound.
#[derive(Clone, Debug)]
pub struct IngestStats {
    pub content: u64,
    pub control: u64,
    pub malformed: u64,
    pub shards_closed: u64,
    reason_counts: BTreeMap<String, u64>,
    reason_overflow: u64,
    reason_cap: usize,
}

impl IngestStats {
    pub fn new(reason_cap: usize) -> Self {
        Self {
            content: 0,
            control: 0,
            malformed: 0,
            shards_closed: 0,
            reason_counts: BTreeMap::new(),
            reason_overflow: 0,
            reason_cap: reason_cap.max(1),
        }
    }

    /// Count one persisted content record; returns the new total.
    pub fn note_content(&mut self) -> u64 {
        self.content += 1;
        self.content
    }

    /// Count one control message; returns the new total.
    pub fn note_control(&mut self) -> u64 {
        self.control += 1;
        self.control
    }

    /// Count one malformed payload under `reason_key`.
    pub fn note_malformed(&mut self, reason_key: &str) -> u64 {
        self.malformed += 1;
        if let Some(n) = self.reason_counts.get_mut(reason_key) {
            *n += 1;
        } else if self.reason_counts.len() < self.reason_cap {
            self.reason_counts.insert(reason_key.to_string(), 1);
        } else {
            self.reason_overflow += 1;
        }
        self.malformed
    }

    pub fn total(&self) -> u64 {
        self.content + self.control + self.malformed
    }

    pub fn reason_counts(&self) -> &BTreeMap<String, u64> {
        &self.reason_counts
    }

    /// Malformed payloads whose reason key fell outside the capped tally.
    pub fn reason_overflow(&self) -> u64 {
        self.reason_overflow
    }

    /// One-line operational summary.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "content={} control={} malformed={} shards_closed={}",
            self.content, self.control, self.malformed, self.shards_closed
        );
        if !self.reason_counts.is_empty() {
            let reasons: Vec<String> = self
                .reason_counts
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            s.push_str(&format!(" reasons[{}]", reasons.join(", ")));
            if self.reason_overflow > 0 {
                s.push_str(&format!(" other={}", self.reason_overflow));
            }
        }
        s
    }
}
