//! Batching Writer
//!
//! A dedicated thread that drains the write queue and turns each drained
//! batch into a single append.

use std::fs::File;
use std::sync::Arc;

use crossbeam::channel::Receiver;

use crate::config::SyncStrategy;
use crate::error::{Result, WalError};
use crate::segment::{Placement, Segment};

use super::{Appender, PendingWrite, Watermark};

/// Messages from the coordinator to the batching writer
pub(crate) enum WriterTask {
    /// Append a write to the current segment
    Append(PendingWrite),

    /// Switch to the segment created by a rotation
    Rebind {
        segment: Arc<Segment>,
        file: File,
        offset: u64,
    },
}

/// Coalesces queued writes into one append per batch
///
/// Runs until the coordinator drops its end of the queue; everything queued
/// before that is still written and resolved.
pub struct BatchWriter {
    appender: Appender,
    tasks: Receiver<WriterTask>,
    capacity: usize,
    sync_strategy: SyncStrategy,
    batches_since_sync: usize,
    watermark: Arc<Watermark>,
}

impl BatchWriter {
    pub(crate) fn new(
        appender: Appender,
        tasks: Receiver<WriterTask>,
        capacity: usize,
        sync_strategy: SyncStrategy,
        watermark: Arc<Watermark>,
    ) -> Self {
        Self {
            appender,
            tasks,
            capacity: capacity.max(1),
            sync_strategy,
            batches_since_sync: 0,
            watermark,
        }
    }

    /// Worker loop
    ///
    /// Blocks for the first task of a batch, then takes whatever else is
    /// immediately available, up to `capacity`. It never waits for more.
    pub fn run(mut self) -> Result<()> {
        tracing::debug!(segment = self.appender.segment().id(), "Batching writer started");

        while let Ok(first) = self.tasks.recv() {
            let mut batch = Vec::with_capacity(self.capacity);
            let mut rebind = None;

            match first {
                WriterTask::Append(write) => batch.push(write),
                task @ WriterTask::Rebind { .. } => rebind = Some(task),
            }

            while rebind.is_none() && batch.len() < self.capacity {
                match self.tasks.try_recv() {
                    Ok(WriterTask::Append(write)) => batch.push(write),
                    Ok(task @ WriterTask::Rebind { .. }) => rebind = Some(task),
                    Err(_) => break,
                }
            }

            // Writes gathered before a rotation belong to the old file
            if !batch.is_empty() {
                self.write_batch(batch);
            }

            if let Some(WriterTask::Rebind {
                segment,
                file,
                offset,
            }) = rebind
            {
                self.rebind(segment, file, offset);
            }
        }

        self.watermark.close();
        tracing::debug!("Batching writer stopped");

        self.appender.sync()?;
        Ok(())
    }

    /// Append one batch and resolve every write in it, in order
    fn write_batch(&mut self, batch: Vec<PendingWrite>) {
        let segment = Arc::clone(self.appender.segment());
        let last_sequence = batch.last().map(|w| w.sequence).unwrap_or(0);

        if segment.is_unusable() {
            for write in batch {
                write.block.resolve(Placement::Failed);
                let _ = write.completion.send(Err(WalError::SegmentUnusable {
                    segment: segment.id(),
                }));
            }
            self.watermark.advance(last_sequence);
            return;
        }

        let start = self.appender.offset();
        let mut buffer = Vec::new();
        let mut staged = Vec::with_capacity(batch.len());

        let mut force_sync = false;
        for write in batch {
            match Appender::encode_block(&write.block, &write.payload) {
                Ok(frame) => {
                    let length = frame.len() as u64;
                    let position = self.appender.reserve(length);
                    force_sync |= write.sync;
                    buffer.extend_from_slice(&frame);
                    staged.push((write, position, length));
                }
                Err(err) => {
                    write.block.resolve(Placement::Failed);
                    let _ = write.completion.send(Err(err));
                }
            }
        }

        let outcome = self
            .appender
            .append(&buffer)
            .and_then(|()| self.maybe_sync(force_sync));

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    segment = segment.id(),
                    writes = staged.len(),
                    bytes = buffer.len(),
                    start,
                    synced = force_sync,
                    "Appended batch"
                );
                for (write, position, length) in staged {
                    write.block.resolve(Placement::Written { position, length });
                    let _ = write.completion.send(Ok(position));
                }
            }
            Err(err) => {
                tracing::error!(
                    segment = segment.id(),
                    writes = staged.len(),
                    start,
                    error = %err,
                    "Batched append failed, segment is now unusable"
                );
                segment.mark_unusable();
                let message = err.to_string();
                for (write, _, _) in staged {
                    write.block.resolve(Placement::Failed);
                    let _ = write.completion.send(Err(WalError::Append {
                        segment: segment.id(),
                        message: message.clone(),
                    }));
                }
            }
        }

        self.watermark.advance(last_sequence);
    }

    /// Sync per the strategy, or unconditionally when a write asked for it
    fn maybe_sync(&mut self, force: bool) -> std::io::Result<()> {
        if force {
            self.batches_since_sync = 0;
            return self.appender.sync();
        }

        match self.sync_strategy {
            SyncStrategy::Never => Ok(()),
            SyncStrategy::EveryBatch => self.appender.sync(),
            SyncStrategy::EveryNBatches { count } => {
                self.batches_since_sync += 1;
                if self.batches_since_sync >= count {
                    self.batches_since_sync = 0;
                    self.appender.sync()
                } else {
                    Ok(())
                }
            }
        }
    }

    fn rebind(&mut self, segment: Arc<Segment>, file: File, offset: u64) {
        let previous_id = self.appender.segment().id();
        let next_id = segment.id();
        let previous = self.appender.rebind(segment, file, offset);
        self.batches_since_sync = 0;

        if self.sync_strategy != SyncStrategy::Never {
            if let Err(err) = previous.sync_data() {
                tracing::warn!(segment = previous_id, error = %err, "Sync of rotated segment failed");
            }
        }

        tracing::debug!(from = previous_id, to = next_id, offset, "Writer rebound");
    }
}
