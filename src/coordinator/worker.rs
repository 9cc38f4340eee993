//! Coordinator worker
//!
//! Owns all mutation of the segment chain.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{Result, WalError};
use crate::segment::{directory, Block, Placement, Segment, SegmentChain};
use crate::writer::{Durable, PendingWrite, Watermark, WriterTask};

use super::Request;

/// Processes requests one at a time on a dedicated thread
pub(crate) struct Coordinator {
    directory: PathBuf,
    chain: Arc<SegmentChain>,
    requests: Receiver<Request>,
    writer: Sender<WriterTask>,
    watermark: Arc<Watermark>,
    /// Sequence number of the last accepted write
    sequence: u64,
    next_segment_id: u64,
    remove_retired: bool,
}

impl Coordinator {
    pub fn new(
        directory: PathBuf,
        chain: Arc<SegmentChain>,
        requests: Receiver<Request>,
        writer: Sender<WriterTask>,
        watermark: Arc<Watermark>,
        next_segment_id: u64,
        remove_retired: bool,
    ) -> Self {
        Self {
            directory,
            chain,
            requests,
            writer,
            watermark,
            sequence: 0,
            next_segment_id,
            remove_retired,
        }
    }

    /// Worker loop; returns once every request sender is dropped
    ///
    /// Dropping `self` on return closes the writer queue, which lets the
    /// batching writer drain and stop.
    pub fn run(mut self) {
        tracing::debug!("Coordinator started");

        while let Ok(request) = self.requests.recv() {
            tracing::trace!(kind = request.kind(), "Processing request");

            match request {
                Request::Write {
                    keys,
                    payload,
                    sync,
                    reply,
                } => {
                    let _ = reply.send(self.write(keys, payload, sync));
                }
                Request::Get { key, reply } => {
                    let _ = reply.send(self.chain.locate(&key));
                }
                Request::Rotate { reply } => {
                    let _ = reply.send(self.rotate());
                }
                Request::Shift { reply } => {
                    let _ = reply.send(self.shift());
                }
                Request::Flush { reply } => {
                    let _ = reply.send(self.sequence);
                }
                #[cfg(test)]
                Request::SwapFile { file, reply } => {
                    self.swap_file(file);
                    let _ = reply.send(());
                }
            }
        }

        tracing::debug!(last_sequence = self.sequence, "Coordinator stopped");
    }

    /// Index the block, then queue it; the block is visible to reads as soon
    /// as the caller is told it is enqueued
    fn write(&mut self, keys: Vec<String>, payload: Bytes, sync: bool) -> Result<Durable> {
        let active = self.active();
        if active.is_unusable() {
            return Err(WalError::SegmentUnusable {
                segment: active.id(),
            });
        }

        self.sequence += 1;
        let sequence = self.sequence;

        let block = active.insert(Block::pending(keys, payload.clone()));
        active.note_sequence(sequence);

        let (completion, receiver) = channel::bounded(1);
        let pending = PendingWrite {
            sequence,
            block: Arc::clone(&block),
            payload,
            sync,
            completion,
        };

        if self.writer.send(WriterTask::Append(pending)).is_err() {
            block.resolve(Placement::Failed);
            return Err(WalError::Closed);
        }

        Ok(Durable::new(sequence, receiver))
    }

    /// Open the next segment and make it active
    ///
    /// Writes accepted before the rotation are already queued ahead of the
    /// rebind, so they still land in the previous file.
    fn rotate(&mut self) -> Result<u64> {
        let id = self.next_segment_id;
        let file = directory::open_append(&self.directory, id)?;
        let offset = file.metadata()?.len();
        if offset > 0 {
            tracing::warn!(segment = id, offset, "Rotating into a non-empty segment file");
        }

        let segment = Arc::new(Segment::new(id, directory::segment_path(&self.directory, id)));
        self.writer
            .send(WriterTask::Rebind {
                segment: Arc::clone(&segment),
                file,
                offset,
            })
            .map_err(|_| WalError::Closed)?;

        self.chain.push(segment);
        self.next_segment_id += 1;

        tracing::info!(segment = id, segments = self.chain.len(), "Rotated to new segment");
        Ok(id)
    }

    /// Retire the oldest segment once every write routed to it is resolved
    fn shift(&mut self) -> Result<Option<u64>> {
        let oldest = match self.chain.oldest_retirable() {
            Some(segment) => segment,
            None => {
                tracing::debug!("Shift ignored, only the active segment remains");
                return Ok(None);
            }
        };

        self.watermark.wait_for(oldest.last_sequence())?;

        let retired = match self.chain.shift() {
            Some(segment) => segment,
            None => return Ok(None),
        };
        let id = retired.id();

        if self.remove_retired {
            directory::remove_segment(&self.directory, id)?;
        }

        tracing::info!(
            segment = id,
            removed = self.remove_retired,
            segments = self.chain.len(),
            "Shifted segment"
        );
        Ok(Some(id))
    }

    #[cfg(test)]
    fn swap_file(&mut self, file: std::fs::File) {
        let active = self.active();
        let offset = file.metadata().map(|m| m.len()).unwrap_or(0);
        let _ = self.writer.send(WriterTask::Rebind {
            segment: active,
            file,
            offset,
        });
    }

    fn active(&self) -> Arc<Segment> {
        self.chain
            .active()
            .expect("segment chain always holds an active segment")
    }
}
