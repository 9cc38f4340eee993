//! Block definitions
//!
//! A block is one logged record: the keys it is indexed under and where its
//! frame sits in the segment file. The payload is held in memory only until
//! the frame is written; after that it is read back from disk on demand.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use parking_lot::Mutex;

/// Where a block ended up on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Appended at `position` as a frame of `length` bytes
    Written { position: u64, length: u64 },

    /// The append covering this block failed
    Failed,
}

/// One immutable logged record
///
/// The placement starts unset and is resolved exactly once by the batching
/// writer (or at load time for recovered blocks).
#[derive(Debug)]
pub struct Block {
    keys: Vec<String>,

    /// Index of the record within its frame
    slot: usize,

    /// Present until the frame is on disk
    payload: Mutex<Option<Bytes>>,

    placement: OnceLock<Placement>,
}

impl Block {
    /// A block that has not been appended yet
    pub(crate) fn pending(keys: Vec<String>, payload: Bytes) -> Self {
        Self {
            keys,
            slot: 0,
            payload: Mutex::new(Some(payload)),
            placement: OnceLock::new(),
        }
    }

    /// A block found in an existing segment file
    pub(crate) fn written(keys: Vec<String>, slot: usize, position: u64, length: u64) -> Self {
        let block = Self {
            keys,
            slot,
            payload: Mutex::new(None),
            placement: OnceLock::new(),
        };
        block.resolve(Placement::Written { position, length });
        block
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    /// The payload, if it has not been written out yet
    pub(crate) fn cached_payload(&self) -> Option<Bytes> {
        self.payload.lock().clone()
    }

    /// `None` while the batched write is still in flight
    pub fn placement(&self) -> Option<Placement> {
        self.placement.get().copied()
    }

    /// Byte offset of the block's frame, once written
    pub fn position(&self) -> Option<u64> {
        match self.placement() {
            Some(Placement::Written { position, .. }) => Some(position),
            _ => None,
        }
    }

    /// Encoded frame length, once written
    pub fn length(&self) -> Option<u64> {
        match self.placement() {
            Some(Placement::Written { length, .. }) => Some(length),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.placement() == Some(Placement::Failed)
    }

    /// Record where the block went; a written block drops its payload
    ///
    /// The placement is set before the payload is released, so a reader that
    /// finds no payload always finds a position.
    pub(crate) fn resolve(&self, placement: Placement) {
        let resolved = self.placement.set(placement).is_ok();
        debug_assert!(resolved, "block placement resolved twice");

        if let Placement::Written { .. } = placement {
            self.payload.lock().take();
        }
    }
}

/// A block together with its loaded payload
#[derive(Debug, Clone)]
pub struct Entry {
    block: Arc<Block>,
    payload: Bytes,
}

impl Entry {
    pub(crate) fn new(block: Arc<Block>, payload: Bytes) -> Self {
        Self { block, payload }
    }

    pub fn keys(&self) -> &[String] {
        self.block.keys()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn placement(&self) -> Option<Placement> {
        self.block.placement()
    }

    pub fn position(&self) -> Option<u64> {
        self.block.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.block.length()
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}
