//! The engine's error taxonomy and how far each class propagates.
//!
//! Classification failures (`MalformedReason`) are outcomes, not errors: the
//! loop records them and moves on. `IngestError::Feed` is transient and
//! handled by the resume path. `IngestError::Storage` is fatal to ingestion.
//! `IngestError::Compression` is isolated to one closed shard and only ever
//! logged by the worker that hit it.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a payload failed classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    /// The payload is not valid JSON.
    Parse,
    /// Valid JSON, but neither an identifier nor a control marker is present.
    UnrecognizedShape,
}

impl MalformedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedReason::Parse => "parse-error",
            MalformedReason::UnrecognizedShape => "unrecognized-shape",
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can escalate out of engine components.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Feed-side failure. Transient: the loop may ask the feed to resume.
    #[error("feed error: {0}")]
    Feed(String),

    /// Local I/O failure on a shard or side file. Fatal to ingestion.
    #[error("storage error on {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compressing one closed shard failed. The uncompressed original is
    /// left intact; not fatal to ingestion.
    #[error("compression error on {}: {source}", .path.display())]
    Compression {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Storage { path: path.into(), source }
    }

    pub(crate) fn compression(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Compression { path: path.into(), source }
    }
}
