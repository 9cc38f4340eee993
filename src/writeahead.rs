//! WriteAhead Module
//!
//! The facade that owns the segment chain and the two worker threads.
//!
//! ## Responsibilities
//! - Recover existing segments on startup
//! - Route writes, lookups, rotations and shifts through the coordinator
//! - Serve scans (`read`, `head`) directly under the chain's read lock
//! - Drain and stop the workers on close

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::channel::{self, Sender};

use crate::codec;
use crate::config::Config;
use crate::coordinator::{Coordinator, Request};
use crate::error::{Result, WalError};
use crate::segment::{self, directory, Entry, RecoveryReport, SegmentChain};
use crate::writer::{Appender, BatchWriter, Durable, Watermark};

/// A segmented write-ahead log
///
/// ## Concurrency Model
///
/// - **Writes, gets, rotate, shift**: serialized by the coordinator thread
///   - Every request is processed to completion before the next is dequeued
///   - A write returns once it is indexed and queued ("enqueued"); the
///     returned [`Durable`] resolves once the batching writer appended it
///
/// - **Scans** (`read`, `head`, `segment_ids`): run on the caller's thread
///   under the chain's shared lock, concurrently with each other
///
/// All methods take `&self`; share the log with `Arc<WriteAhead>`.
pub struct WriteAhead {
    config: Config,
    chain: Arc<SegmentChain>,
    watermark: Arc<Watermark>,
    requests: Option<Sender<Request>>,
    coordinator: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<Result<()>>>,
    recovery: RecoveryReport,
}

impl WriteAhead {
    /// Open or create a log with the given config
    ///
    /// On startup:
    /// 1. Validate config, create the directory if allowed
    /// 2. Replay existing segments (or create segment 0)
    /// 3. Bind the appender to the last segment at its current length
    /// 4. Start the batching writer and the coordinator
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let dir = config.directory.clone();
        if config.create_directory {
            fs::create_dir_all(&dir).map_err(|e| WalError::startup(&dir, e))?;
        }

        let (segments, recovery) = segment::recover(&dir)?;
        tracing::info!(
            directory = %dir.display(),
            segments = recovery.segments,
            blocks = recovery.blocks,
            truncated_bytes = recovery.truncated_bytes,
            created = recovery.created,
            "Recovered write-ahead log"
        );

        let chain = Arc::new(SegmentChain::new(segments));
        let active = chain
            .active()
            .ok_or_else(|| WalError::Corruption("recovery produced no segments".to_string()))?;
        let next_segment_id = active.id() + 1;

        let active_path = directory::segment_path(&dir, active.id());
        let file = directory::open_append(&dir, active.id())
            .map_err(|e| WalError::startup(&active_path, e))?;
        let appender = Appender::open(active, file)?;

        let watermark = Arc::new(Watermark::new());

        // Step 1: Batching writer
        let (writer_tx, writer_rx) = channel::bounded(config.writer_queue_depth);
        let batch_writer = BatchWriter::new(
            appender,
            writer_rx,
            config.batch_capacity,
            config.sync_strategy,
            Arc::clone(&watermark),
        );
        let writer = thread::Builder::new()
            .name("writeahead-writer".to_string())
            .spawn(move || batch_writer.run())?;

        // Step 2: Coordinator
        let (request_tx, request_rx) = channel::bounded(config.request_queue_depth);
        let coordinator = Coordinator::new(
            dir,
            Arc::clone(&chain),
            request_rx,
            writer_tx,
            Arc::clone(&watermark),
            next_segment_id,
            config.remove_retired,
        );
        let coordinator = thread::Builder::new()
            .name("writeahead-coordinator".to_string())
            .spawn(move || coordinator.run())?;

        Ok(Self {
            config,
            chain,
            watermark,
            requests: Some(request_tx),
            coordinator: Some(coordinator),
            writer: Some(writer),
            recovery,
        })
    }

    // =========================================================================
    // Coordinated Operations
    // =========================================================================

    /// Log `payload` under `keys`
    ///
    /// Returns once the block is indexed and queued: a `get` issued after this
    /// returns sees it. Wait on the returned [`Durable`] for the append.
    pub fn write<I, K>(&self, keys: I, payload: impl Into<Bytes>) -> Result<Durable>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.submit_write(keys, payload.into(), false)
    }

    /// Like [`write`](WriteAhead::write), but the batch carrying this write is
    /// fsynced before it resolves, whatever the sync strategy
    pub fn write_sync<I, K>(&self, keys: I, payload: impl Into<Bytes>) -> Result<Durable>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.submit_write(keys, payload.into(), true)
    }

    fn submit_write<I, K>(&self, keys: I, payload: Bytes, sync: bool) -> Result<Durable>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();

        // Rejected before indexing: a frame readers refuse must never be
        // acknowledged
        let size = codec::record_body_len(&keys, payload.len())?;
        if size > self.config.max_record_size {
            return Err(WalError::RecordTooLarge {
                size,
                max: self.config.max_record_size,
            });
        }

        let (reply, response) = channel::bounded(1);
        self.submit(Request::Write {
            keys,
            payload,
            sync,
            reply,
        })?;

        response.recv().map_err(|_| WalError::Closed)?
    }

    /// Most recent block written under `key`, with its payload, or `None`
    ///
    /// Search order: newest segment → oldest, latest block first. The lookup
    /// is ordered with writes by the coordinator; a payload already on disk
    /// is read back on the caller's thread.
    pub fn get(&self, key: &str) -> Result<Option<Entry>> {
        let (reply, response) = channel::bounded(1);
        self.submit(Request::Get {
            key: key.to_string(),
            reply,
        })?;

        match response.recv().map_err(|_| WalError::Closed)? {
            Some((segment, block)) => segment.load(&block).map(Some),
            None => Ok(None),
        }
    }

    /// Close the active segment to writes and open a new one
    ///
    /// Returns the id of the new active segment.
    pub fn rotate(&self) -> Result<u64> {
        let (reply, response) = channel::bounded(1);
        self.submit(Request::Rotate { reply })?;
        response.recv().map_err(|_| WalError::Closed)?
    }

    /// Retire the oldest segment
    ///
    /// Returns its id, or `None` when only the active segment remains.
    pub fn shift(&self) -> Result<Option<u64>> {
        let (reply, response) = channel::bounded(1);
        self.submit(Request::Shift { reply })?;
        response.recv().map_err(|_| WalError::Closed)?
    }

    /// Wait until every write accepted so far has been resolved
    pub fn flush(&self) -> Result<()> {
        let (reply, response) = channel::bounded(1);
        self.submit(Request::Flush { reply })?;
        let sequence = response.recv().map_err(|_| WalError::Closed)?;
        self.watermark.wait_for(sequence)
    }

    // =========================================================================
    // Scans (shared lock, caller's thread)
    // =========================================================================

    /// Every payload ever written under `key`, oldest first
    pub fn read(&self, key: &str) -> Result<Vec<Bytes>> {
        self.chain.read(key)
    }

    /// Every block of the oldest segment, once it is no longer active
    ///
    /// Lets a consumer fold a segment into its own storage before `shift`.
    pub fn head(&self) -> Result<Vec<Entry>> {
        self.chain.head()
    }

    /// Live segment ids, oldest first
    pub fn segment_ids(&self) -> Vec<u64> {
        self.chain.ids()
    }

    /// Number of live segments
    pub fn segment_count(&self) -> usize {
        self.chain.len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drain pending writes, stop the workers and sync the active segment
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        // Dropping the last sender ends the coordinator loop, which in turn
        // closes the writer queue
        drop(self.requests.take());

        if let Some(handle) = self.coordinator.take() {
            if handle.join().is_err() {
                tracing::error!("Coordinator thread panicked");
                return Err(WalError::Closed);
            }
        }

        if let Some(handle) = self.writer.take() {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => {
                    tracing::error!("Batching writer thread panicked");
                    return Err(WalError::Closed);
                }
            }
        }

        Ok(())
    }

    fn submit(&self, request: Request) -> Result<()> {
        let requests = self.requests.as_ref().ok_or(WalError::Closed)?;
        requests.send(request).map_err(|_| WalError::Closed)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the log directory path
    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// What was found on disk at open
    pub fn recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Highest write sequence resolved so far
    pub fn resolved_sequence(&self) -> u64 {
        self.watermark.resolved()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for WriteAhead {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "Write-ahead log did not shut down cleanly");
        }
    }
}
