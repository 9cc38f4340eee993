//! Tests for replaying segment files on startup
//!
//! These tests verify:
//! - Blocks are rebuilt at the positions their frames occupy
//! - A torn tail on the last segment is truncated
//! - Torn read-only segments are reported and left alone
//! - An empty directory gets segment 0

use tempfile::TempDir;
use writeahead::codec::{encode, FrameStop, RecordHeader};
use writeahead::segment::{directory, recover, replay_segment, Placement};

use crate::common::{append_garbage, file_len, write_segment};

#[test]
fn test_recover_empty_directory_creates_segment_zero() {
    let temp = TempDir::new().unwrap();

    let (segments, report) = recover(temp.path()).unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].id(), 0);
    assert!(report.created);
    assert_eq!(report.blocks, 0);
    assert!(directory::segment_path(temp.path(), 0).exists());
}

#[test]
fn test_replay_places_blocks_at_frame_offsets() {
    let temp = TempDir::new().unwrap();
    let lengths = write_segment(
        temp.path(),
        0,
        &[("a", "first"), ("b,c", "second"), ("a", "third")],
    );

    let replayed = replay_segment(temp.path(), 0).unwrap();
    assert_eq!(replayed.frames, 3);
    assert!(!replayed.has_torn_tail());

    let blocks = replayed.segment.blocks();
    assert_eq!(blocks.len(), 3);
    assert_eq!(
        blocks[0].placement(),
        Some(Placement::Written { position: 0, length: lengths[0] })
    );
    assert_eq!(blocks[1].position(), Some(lengths[0]));
    assert_eq!(blocks[2].position(), Some(lengths[0] + lengths[1]));

    let latest = replayed.segment.latest_entry("a").unwrap().unwrap();
    assert_eq!(&latest.payload()[..], b"third");
    assert_eq!(&replayed.segment.latest_entry("c").unwrap().unwrap().payload()[..], b"second");
    assert_eq!(replayed.segment.key_count(), 3);
}

#[test]
fn test_recover_truncates_torn_tail_of_last_segment() {
    let temp = TempDir::new().unwrap();
    let lengths = write_segment(temp.path(), 0, &[("k", "v1"), ("k", "v2")]);
    let valid: u64 = lengths.iter().sum();
    append_garbage(temp.path(), 0, &[0x20, 0, 0, 0, 1, 2]);

    let (segments, report) = recover(temp.path()).unwrap();

    assert_eq!(report.truncated_bytes, 6);
    assert!(report.damaged_segments.is_empty());
    assert_eq!(segments[0].block_count(), 2);
    assert_eq!(file_len(temp.path(), 0), valid);
}

#[test]
fn test_recover_reports_torn_read_only_segment() {
    let temp = TempDir::new().unwrap();
    write_segment(temp.path(), 0, &[("k", "old")]);
    append_garbage(temp.path(), 0, &[0xAB; 3]);
    write_segment(temp.path(), 1, &[("k", "new")]);
    let damaged_len = file_len(temp.path(), 0);

    let (segments, report) = recover(temp.path()).unwrap();

    assert_eq!(report.segments, 2);
    assert_eq!(report.damaged_segments, vec![0]);
    assert_eq!(report.truncated_bytes, 0);
    assert_eq!(report.blocks, 2);
    assert_eq!(segments[0].block_count(), 1);
    // Read-only segments are never rewritten
    assert_eq!(file_len(temp.path(), 0), damaged_len);
}

#[test]
fn test_replay_stops_at_corrupt_frame() {
    let temp = TempDir::new().unwrap();
    let lengths = write_segment(temp.path(), 0, &[("a", "good"), ("b", "bad")]);

    // Flip the last byte of the second frame's payload
    let path = directory::segment_path(temp.path(), 0);
    let mut data = std::fs::read(&path).unwrap();
    let last = data.len() - 1;
    data[last] ^= 0xFF;
    std::fs::write(&path, data).unwrap();

    let replayed = replay_segment(temp.path(), 0).unwrap();
    assert_eq!(replayed.frames, 1);
    assert_eq!(replayed.valid_len, lengths[0]);
    assert_eq!(replayed.stop, Some(FrameStop::ChecksumMismatch));
    assert!(replayed.segment.latest("b").is_none());
}

#[test]
fn test_recover_keeps_segment_gaps() {
    let temp = TempDir::new().unwrap();
    write_segment(temp.path(), 3, &[("x", "three")]);
    write_segment(temp.path(), 7, &[("x", "seven")]);

    let (segments, report) = recover(temp.path()).unwrap();

    let ids: Vec<u64> = segments.iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec![3, 7]);
    assert!(!report.created);
}

#[test]
fn test_replay_loads_each_record_of_a_shared_frame() {
    let temp = TempDir::new().unwrap();
    let first = RecordHeader { keys: vec!["a".to_string()] }.to_bytes().unwrap();
    let second = RecordHeader { keys: vec!["b".to_string()] }.to_bytes().unwrap();
    let frame = encode(&[
        (first.as_slice(), b"first".as_slice()),
        (second.as_slice(), b"second".as_slice()),
    ])
    .unwrap();
    std::fs::write(directory::segment_path(temp.path(), 0), &frame).unwrap();

    let replayed = replay_segment(temp.path(), 0).unwrap();
    let blocks = replayed.segment.blocks();

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].placement(), blocks[1].placement());
    assert_eq!(&replayed.segment.latest_entry("a").unwrap().unwrap().payload()[..], b"first");
    assert_eq!(&replayed.segment.latest_entry("b").unwrap().unwrap().payload()[..], b"second");
}

#[test]
fn test_replay_streams_segments_larger_than_its_buffer() {
    let temp = TempDir::new().unwrap();
    let big = "x".repeat(700 * 1024);
    let lengths = write_segment(temp.path(), 0, &[("a", big.as_str()), ("b", big.as_str()), ("c", "tail")]);

    let replayed = replay_segment(temp.path(), 0).unwrap();

    assert_eq!(replayed.frames, 3);
    assert_eq!(replayed.valid_len, lengths.iter().sum::<u64>());
    let entry = replayed.segment.latest_entry("b").unwrap().unwrap();
    assert_eq!(entry.payload().len(), big.len());
    assert_eq!(entry.position(), Some(lengths[0]));
}
