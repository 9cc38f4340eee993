//! Completion tracking
//!
//! Every accepted write carries a one-shot completion channel; the batching
//! writer resolves them in submission order. A watermark records the highest
//! sequence number resolved so far so callers can wait for "everything up to
//! here" without polling.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};

use crate::error::{Result, WalError};
use crate::segment::Block;

/// A write accepted by the coordinator and awaiting its position
pub(crate) struct PendingWrite {
    pub sequence: u64,
    pub block: Arc<Block>,
    pub payload: Bytes,
    /// Force an fsync of the batch carrying this write
    pub sync: bool,
    pub completion: Sender<Result<u64>>,
}

/// Durability acknowledgment for one write
///
/// Resolves exactly once, with the frame's byte position or the error that
/// prevented the append.
#[derive(Debug)]
pub struct Durable {
    sequence: u64,
    receiver: Receiver<Result<u64>>,
}

impl Durable {
    pub(crate) fn new(sequence: u64, receiver: Receiver<Result<u64>>) -> Self {
        Self { sequence, receiver }
    }

    /// Acceptance order of the write (1-based, per open)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Block until the write is appended
    pub fn wait(self) -> Result<u64> {
        self.receiver.recv().map_err(|_| WalError::Closed)?
    }

    /// Block for at most `timeout`; `None` if the write is still in flight
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<u64>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(WalError::Closed)),
        }
    }
}

#[derive(Debug, Default)]
struct WatermarkState {
    resolved: u64,
    closed: bool,
}

/// Highest write sequence whose result has been delivered
#[derive(Debug, Default)]
pub struct Watermark {
    state: Mutex<WatermarkState>,
    changed: Condvar,
}

impl Watermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolved(&self) -> u64 {
        self.state.lock().resolved
    }

    /// Record that every write up to `sequence` is resolved
    pub fn advance(&self, sequence: u64) {
        let mut state = self.state.lock();
        if sequence > state.resolved {
            state.resolved = sequence;
            self.changed.notify_all();
        }
    }

    /// Wake every waiter; later waits fail once the target is unreachable
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.changed.notify_all();
    }

    /// Block until `sequence` is resolved
    pub fn wait_for(&self, sequence: u64) -> Result<()> {
        let mut state = self.state.lock();
        while state.resolved < sequence {
            if state.closed {
                return Err(WalError::Closed);
            }
            self.changed.wait(&mut state);
        }
        Ok(())
    }
}
