//! Segment index
//!
//! Blocks live once in a per-segment arena; the key index stores handles into
//! that arena, so a block written under several keys is shared, not copied.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::codec;
use crate::error::{Result, WalError};

use super::{Block, Entry, Placement};

/// Index of a block within its segment's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BlockHandle(usize);

/// Lifecycle state of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Last segment of the chain, accepts writes
    Active,

    /// Superseded by a rotation
    ReadOnly,

    /// Shifted out of the chain, file may be deleted
    Retired,
}

#[derive(Debug, Default)]
struct SegmentIndex {
    /// Arena, in write order
    blocks: Vec<Arc<Block>>,

    /// key → handles in write order
    keys: HashMap<String, Vec<BlockHandle>>,
}

/// One append-only log file and its block index
///
/// ## Concurrency:
/// - `index`: RwLock, written only by the coordinator while the segment is active
/// - `state`: Mutex, transitions driven by rotate/shift
/// - `unusable`: set by the batching writer after a failed append
/// - `reader`: read handle shared by payload loads, opened on first use
#[derive(Debug)]
pub struct Segment {
    id: u64,
    path: PathBuf,
    state: Mutex<SegmentState>,
    index: RwLock<SegmentIndex>,

    /// Sequence number of the last write routed to this segment
    last_sequence: AtomicU64,

    unusable: AtomicBool,

    reader: Mutex<Option<File>>,
}

impl Segment {
    /// Create an empty active segment backed by the file at `path`
    pub fn new(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
            state: Mutex::new(SegmentState::Active),
            index: RwLock::new(SegmentIndex::default()),
            last_sequence: AtomicU64::new(0),
            unusable: AtomicBool::new(false),
            reader: Mutex::new(None),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SegmentState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SegmentState::Active
    }

    pub fn is_retired(&self) -> bool {
        self.state() == SegmentState::Retired
    }

    /// Append a block to the arena and index it under each of its keys
    pub(crate) fn insert(&self, block: Block) -> Arc<Block> {
        debug_assert!(self.is_active(), "insert into non-active segment {}", self.id);

        let block = Arc::new(block);
        let mut index = self.index.write();

        let handle = BlockHandle(index.blocks.len());
        index.blocks.push(Arc::clone(&block));

        for key in block.keys() {
            let handles = index.keys.entry(key.clone()).or_default();
            // A key listed twice in one record is indexed once
            if handles.last() != Some(&handle) {
                handles.push(handle);
            }
        }

        block
    }

    /// Most recent block for `key`, skipping blocks whose append failed
    pub fn latest(&self, key: &str) -> Option<Arc<Block>> {
        let index = self.index.read();
        let handles = index.keys.get(key)?;

        handles
            .iter()
            .rev()
            .map(|handle| &index.blocks[handle.0])
            .find(|block| !block.is_failed())
            .cloned()
    }

    /// Every live block for `key`, in write order
    pub fn blocks_for(&self, key: &str) -> Vec<Arc<Block>> {
        let index = self.index.read();
        match index.keys.get(key) {
            Some(handles) => handles
                .iter()
                .map(|handle| &index.blocks[handle.0])
                .filter(|block| !block.is_failed())
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every live block in the segment, in write order
    pub fn blocks(&self) -> Vec<Arc<Block>> {
        self.index
            .read()
            .blocks
            .iter()
            .filter(|block| !block.is_failed())
            .cloned()
            .collect()
    }

    /// Number of blocks in the arena (failed ones included)
    pub fn block_count(&self) -> usize {
        self.index.read().blocks.len()
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.index.read().keys.len()
    }

    // =========================================================================
    // Payload Loading
    // =========================================================================

    /// Pair `block` with its payload
    ///
    /// Blocks still in flight answer from memory; written blocks re-read
    /// their frame from the segment file.
    pub fn load(&self, block: &Arc<Block>) -> Result<Entry> {
        if let Some(payload) = block.cached_payload() {
            return Ok(Entry::new(Arc::clone(block), payload));
        }

        let (position, length) = match block.placement() {
            Some(Placement::Written { position, length }) => (position, length),
            _ => {
                return Err(WalError::Corruption(format!(
                    "block in segment {} has neither a payload nor a position",
                    self.id
                )))
            }
        };

        let frame = codec::decode_one(self.read_at(position, length)?)?;
        let record = frame
            .records()?
            .into_iter()
            .nth(block.slot())
            .ok_or_else(|| {
                WalError::Corruption(format!(
                    "frame at {} in segment {} has no record {}",
                    position,
                    self.id,
                    block.slot()
                ))
            })?;

        Ok(Entry::new(Arc::clone(block), record.payload))
    }

    /// Latest live block for `key`, loaded
    pub fn latest_entry(&self, key: &str) -> Result<Option<Entry>> {
        self.latest(key).map(|block| self.load(&block)).transpose()
    }

    fn read_at(&self, position: u64, length: u64) -> Result<Bytes> {
        let mut reader = self.reader.lock();
        let mut file = match reader.take() {
            Some(file) => file,
            None => File::open(&self.path)?,
        };

        let mut buf = vec![0u8; length as usize];
        let read = file
            .seek(SeekFrom::Start(position))
            .and_then(|_| file.read_exact(&mut buf));
        *reader = Some(file);
        read?;

        Ok(Bytes::from(buf))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Active → read-only
    pub(crate) fn seal(&self) {
        let mut state = self.state.lock();
        if *state == SegmentState::Active {
            *state = SegmentState::ReadOnly;
        }
    }

    /// Any → retired
    pub(crate) fn retire(&self) {
        *self.state.lock() = SegmentState::Retired;
    }

    pub(crate) fn note_sequence(&self, sequence: u64) {
        self.last_sequence.store(sequence, Ordering::Release);
    }

    /// Sequence number of the last write routed here (0 if none this session)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }

    pub(crate) fn mark_unusable(&self) {
        self.unusable.store(true, Ordering::Release);
    }

    /// Set after an append to this segment's file failed
    pub fn is_unusable(&self) -> bool {
        self.unusable.load(Ordering::Acquire)
    }
}
