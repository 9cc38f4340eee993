//! Segment recovery
//!
//! Rebuilds the in-memory index of every segment by replaying its file
//! through the framing codec.

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::Path;

use crate::codec::{FrameReader, FrameStop};
use crate::error::{Result, WalError};

use super::{directory, Block, Segment};

/// A segment rebuilt from its file
#[derive(Debug)]
pub struct ReplayedSegment {
    /// Segment with its index populated (still active)
    pub segment: Segment,

    /// Bytes covered by complete, verified frames
    pub valid_len: u64,

    /// Size of the file on disk
    pub file_len: u64,

    /// Number of frames replayed
    pub frames: u64,

    /// Why replay stopped early, if it did
    pub stop: Option<FrameStop>,
}

impl ReplayedSegment {
    /// Whether the file ends with a partial or corrupt frame
    pub fn has_torn_tail(&self) -> bool {
        self.valid_len < self.file_len
    }
}

/// Result of opening a log directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of segments found on disk (or created)
    pub segments: usize,

    /// Number of blocks loaded into the indexes
    pub blocks: u64,

    /// Bytes cut from the active segment's torn tail
    pub truncated_bytes: u64,

    /// Read-only segments that end in a torn frame (left untouched)
    pub damaged_segments: Vec<u64>,

    /// Whether the directory was empty and segment 0 was created
    pub created: bool,
}

/// Read buffer used while replaying a segment file
const REPLAY_BUFFER_SIZE: usize = 1024 * 1024;

/// Replay one segment file without modifying it
///
/// The file is streamed frame by frame. Blocks are placed at the position and
/// length their frame occupies; payloads are not kept.
pub fn replay_segment(dir: &Path, id: u64) -> Result<ReplayedSegment> {
    let path = directory::segment_path(dir, id);
    let file = File::open(&path).map_err(|e| WalError::startup(&path, e))?;
    let file_len = file
        .metadata()
        .map_err(|e| WalError::startup(&path, e))?
        .len();

    let segment = Segment::new(id, &path);
    let mut reader = FrameReader::new(BufReader::with_capacity(REPLAY_BUFFER_SIZE, file));
    let mut frames = 0;

    for frame in reader.by_ref() {
        let frame = frame?;
        for (slot, record) in frame.records()?.into_iter().enumerate() {
            segment.insert(Block::written(record.keys, slot, frame.offset, frame.length));
        }
        frames += 1;
    }

    Ok(ReplayedSegment {
        segment,
        valid_len: reader.valid_len(),
        file_len,
        frames,
        stop: reader.stop_reason(),
    })
}

/// Recover every segment in `dir`, oldest first
///
/// On startup:
/// 1. Discover segment ids (decimal file names)
/// 2. Replay each file into a fresh index
/// 3. Truncate a torn tail on the last (active) segment
/// 4. Create segment 0 if the directory holds none
pub fn recover(dir: &Path) -> Result<(Vec<Segment>, RecoveryReport)> {
    let ids = directory::list_segment_ids(dir).map_err(|e| WalError::startup(dir, e))?;
    let mut report = RecoveryReport::default();

    if ids.is_empty() {
        directory::create_segment(dir, 0)
            .map_err(|e| WalError::startup(directory::segment_path(dir, 0), e))?;
        report.segments = 1;
        report.created = true;
        return Ok((vec![Segment::new(0, directory::segment_path(dir, 0))], report));
    }

    let mut segments = Vec::with_capacity(ids.len());
    let last = ids.len() - 1;

    for (i, id) in ids.into_iter().enumerate() {
        let replayed = replay_segment(dir, id)?;
        report.blocks += replayed.segment.block_count() as u64;

        if replayed.has_torn_tail() {
            let stop = replayed
                .stop
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());

            if i == last {
                let cut = replayed.file_len - replayed.valid_len;
                tracing::warn!(
                    segment = id,
                    valid_len = replayed.valid_len,
                    cut,
                    reason = %stop,
                    "Truncating torn tail of active segment"
                );
                truncate(dir, id, replayed.valid_len)?;
                report.truncated_bytes = cut;
            } else {
                tracing::warn!(
                    segment = id,
                    valid_len = replayed.valid_len,
                    file_len = replayed.file_len,
                    reason = %stop,
                    "Read-only segment ends in a torn frame"
                );
                report.damaged_segments.push(id);
            }
        }

        segments.push(replayed.segment);
    }

    report.segments = segments.len();
    Ok((segments, report))
}

fn truncate(dir: &Path, id: u64, len: u64) -> Result<()> {
    let path = directory::segment_path(dir, id);
    let file = OpenOptions::new()
        .write(true)
        .open(&path)
        .map_err(|e| WalError::startup(&path, e))?;
    file.set_len(len).map_err(|e| WalError::startup(&path, e))?;
    file.sync_all().map_err(|e| WalError::startup(&path, e))?;
    Ok(())
}
