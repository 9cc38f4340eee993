//! Configuration for writeahead
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::codec::MAX_FRAME_BODY;
use crate::error::{Result, WalError};

/// Main configuration for a write-ahead log instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory dedicated to the log. Internal structure:
    ///   {directory}/
    ///     ├── 0        (oldest segment)
    ///     ├── 1
    ///     └── N        (active segment)
    pub directory: PathBuf,

    /// Create the directory if it does not exist
    pub create_directory: bool,

    /// Unlink a segment's file once it has been shifted out of the chain
    pub remove_retired: bool,

    // -------------------------------------------------------------------------
    // Write Path Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the active segment
    pub sync_strategy: SyncStrategy,

    /// Max writes coalesced into a single append
    pub batch_capacity: usize,

    /// Depth of the caller → coordinator request queue
    pub request_queue_depth: usize,

    /// Depth of the coordinator → batching writer queue
    pub writer_queue_depth: usize,

    /// Largest encoded record (frame body, keys included) a write may carry
    pub max_record_size: u64,
}

/// Segment sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Leave flushing to the operating system
    Never,

    /// fsync after every batched append (safest, slowest)
    EveryBatch,

    /// fsync after N batched appends
    EveryNBatches { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./writeahead_data"),
            create_directory: true,
            remove_retired: false,
            sync_strategy: SyncStrategy::Never,
            batch_capacity: 32,
            request_queue_depth: 1024,
            writer_queue_depth: 1024,
            max_record_size: u64::from(MAX_FRAME_BODY),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity == 0 {
            return Err(WalError::Config("batch_capacity must be at least 1".to_string()));
        }
        if self.request_queue_depth == 0 {
            return Err(WalError::Config(
                "request_queue_depth must be at least 1".to_string(),
            ));
        }
        if self.writer_queue_depth == 0 {
            return Err(WalError::Config(
                "writer_queue_depth must be at least 1".to_string(),
            ));
        }
        if self.max_record_size == 0 || self.max_record_size > u64::from(MAX_FRAME_BODY) {
            return Err(WalError::Config(format!(
                "max_record_size must be between 1 and {}",
                MAX_FRAME_BODY
            )));
        }
        if let SyncStrategy::EveryNBatches { count: 0 } = self.sync_strategy {
            return Err(WalError::Config(
                "EveryNBatches count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the log directory
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.directory = path.into();
        self
    }

    /// Whether to create a missing directory on open
    pub fn create_directory(mut self, create: bool) -> Self {
        self.config.create_directory = create;
        self
    }

    /// Whether shifted segments have their files removed
    pub fn remove_retired(mut self, remove: bool) -> Self {
        self.config.remove_retired = remove;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the maximum number of writes per batched append
    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.config.batch_capacity = capacity;
        self
    }

    /// Set the request queue depth
    pub fn request_queue_depth(mut self, depth: usize) -> Self {
        self.config.request_queue_depth = depth;
        self
    }

    /// Set the writer queue depth
    pub fn writer_queue_depth(mut self, depth: usize) -> Self {
        self.config.writer_queue_depth = depth;
        self
    }

    /// Set the record size limit
    pub fn max_record_size(mut self, size: u64) -> Self {
        self.config.max_record_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
