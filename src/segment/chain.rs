//! Segment chain
//!
//! Ordered list of live segments, oldest first. The last one is active.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::Result;

use super::{Block, Entry, Segment};

/// The live segments of a log
///
/// ## Concurrency:
/// - Readers take the shared lock for the duration of a lookup
/// - The exclusive lock is only taken by rotate (`push`) and shift (`shift`),
///   so ordinary writes never contend with readers here
pub struct SegmentChain {
    segments: RwLock<Vec<Arc<Segment>>>,
}

impl SegmentChain {
    /// Build a chain from segments ordered oldest first
    ///
    /// Every segment but the last is sealed read-only.
    pub fn new(segments: Vec<Segment>) -> Self {
        let count = segments.len();
        let segments: Vec<Arc<Segment>> = segments.into_iter().map(Arc::new).collect();
        for segment in segments.iter().take(count.saturating_sub(1)) {
            segment.seal();
        }
        Self {
            segments: RwLock::new(segments),
        }
    }

    /// The segment currently accepting writes
    pub fn active(&self) -> Option<Arc<Segment>> {
        self.segments.read().last().cloned()
    }

    /// The oldest segment, if it is not also the active one
    pub fn oldest_retirable(&self) -> Option<Arc<Segment>> {
        let segments = self.segments.read();
        if segments.len() > 1 {
            segments.first().cloned()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.segments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.read().is_empty()
    }

    /// Segment ids, oldest first
    pub fn ids(&self) -> Vec<u64> {
        self.segments.read().iter().map(|s| s.id()).collect()
    }

    /// Most recent live block for `key` and the segment holding it
    ///
    /// Search order: newest segment → oldest, tail block → head within each.
    pub fn locate(&self, key: &str) -> Option<(Arc<Segment>, Arc<Block>)> {
        let segments = self.segments.read();
        segments
            .iter()
            .rev()
            .filter(|segment| !segment.is_retired())
            .find_map(|segment| segment.latest(key).map(|block| (Arc::clone(segment), block)))
    }

    /// Most recent live block for `key`, loaded
    pub fn latest(&self, key: &str) -> Result<Option<Entry>> {
        self.locate(key)
            .map(|(segment, block)| segment.load(&block))
            .transpose()
    }

    /// Every payload written under `key`, oldest first
    ///
    /// The matching blocks are collected under the shared lock; payloads are
    /// loaded after it is released.
    pub fn read(&self, key: &str) -> Result<Vec<Bytes>> {
        let found: Vec<(Arc<Segment>, Vec<Arc<Block>>)> = {
            let segments = self.segments.read();
            segments
                .iter()
                .filter(|segment| !segment.is_retired())
                .map(|segment| (Arc::clone(segment), segment.blocks_for(key)))
                .collect()
        };

        let mut payloads = Vec::new();
        for (segment, blocks) in found {
            for block in blocks {
                payloads.push(segment.load(&block)?.into_payload());
            }
        }
        Ok(payloads)
    }

    /// Every block of the oldest segment, empty while it is still active
    pub fn head(&self) -> Result<Vec<Entry>> {
        match self.oldest_retirable() {
            Some(segment) => segment
                .blocks()
                .iter()
                .map(|block| segment.load(block))
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    // =========================================================================
    // Mutation (coordinator only)
    // =========================================================================

    /// Append a new active segment, sealing the previous one
    pub(crate) fn push(&self, segment: Arc<Segment>) {
        let mut segments = self.segments.write();
        if let Some(previous) = segments.last() {
            previous.seal();
        }
        segments.push(segment);
    }

    /// Remove and retire the oldest segment, never the active one
    pub(crate) fn shift(&self) -> Option<Arc<Segment>> {
        let mut segments = self.segments.write();
        if segments.len() <= 1 {
            return None;
        }
        let segment = segments.remove(0);
        segment.retire();
        Some(segment)
    }
}
