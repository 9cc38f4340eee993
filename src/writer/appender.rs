//! Appender
//!
//! Single source of truth for where the next byte of the active segment goes.

use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use crate::codec::{self, RecordHeader};
use crate::error::Result;
use crate::segment::{Block, Segment};

/// Owns the active segment's file handle and next write offset
pub struct Appender {
    segment: Arc<Segment>,
    file: File,
    offset: u64,
}

impl Appender {
    /// Bind to a segment file whose current length is `offset`
    pub fn new(segment: Arc<Segment>, file: File, offset: u64) -> Self {
        Self {
            segment,
            file,
            offset,
        }
    }

    /// Bind to a segment file, resuming at its current length
    pub fn open(segment: Arc<Segment>, file: File) -> Result<Self> {
        let offset = file.metadata()?.len();
        Ok(Self::new(segment, file, offset))
    }

    /// Encode `(keys-encoding, payload)` pairs as one frame
    ///
    /// Pure: offset bookkeeping is left to the caller.
    pub fn record(pairs: &[(&[u8], &[u8])]) -> Result<Vec<u8>> {
        codec::encode(pairs)
    }

    /// Encode a block and its payload as their own frame
    pub fn encode_block(block: &Block, payload: &[u8]) -> Result<Vec<u8>> {
        let header = RecordHeader {
            keys: block.keys().to_vec(),
        }
        .to_bytes()?;
        Self::record(&[(header.as_slice(), payload)])
    }

    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }

    /// Next byte position in the active segment file
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reserve `len` bytes, returning the position they start at
    pub fn reserve(&mut self, len: u64) -> u64 {
        let position = self.offset;
        self.offset += len;
        position
    }

    /// Append a buffer with a single write
    pub fn append(&mut self, buffer: &[u8]) -> std::io::Result<()> {
        self.file.write_all(buffer)
    }

    pub fn sync(&self) -> std::io::Result<()> {
        self.file.sync_data()
    }

    /// Switch to a new segment file, returning the previous file
    pub fn rebind(&mut self, segment: Arc<Segment>, file: File, offset: u64) -> File {
        self.segment = segment;
        self.offset = offset;
        std::mem::replace(&mut self.file, file)
    }
}
