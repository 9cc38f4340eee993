//! Error types for writeahead
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using WalError
pub type Result<T> = std::result::Result<T, WalError>;

/// Unified error type for write-ahead log operations
#[derive(Debug, Error)]
pub enum WalError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The log directory or a segment file could not be opened at startup
    #[error("Startup failed at {}: {source}", .path.display())]
    Startup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Append Errors
    // -------------------------------------------------------------------------
    /// The batched append covering this write failed
    #[error("Append to segment {segment} failed: {message}")]
    Append { segment: u64, message: String },

    /// A previous append failed and the segment no longer accepts writes
    #[error("Segment {segment} is unusable after a failed append")]
    SegmentUnusable { segment: u64 },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A record whose frame would exceed the size a reader accepts
    #[error("Record of {size} bytes exceeds the {max} byte limit")]
    RecordTooLarge { size: u64, max: u64 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    /// The coordinator or writer thread has stopped
    #[error("Write-ahead log is closed")]
    Closed,
}

impl WalError {
    /// Wrap an I/O error raised while opening the log
    pub fn startup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WalError::Startup {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was produced by a failed disk append
    pub fn is_append_failure(&self) -> bool {
        matches!(self, WalError::Append { .. } | WalError::SegmentUnusable { .. })
    }
}

impl From<bincode::Error> for WalError {
    fn from(err: bincode::Error) -> Self {
        WalError::Serialization(err.to_string())
    }
}
