//! Tests for frame encoding and decoding
//!
//! These tests verify:
//! - Multi-record frames keep their parts in order
//! - Readers stop cleanly at torn or corrupted tails
//! - Strict single-frame decoding

use bytes::Bytes;
use writeahead::codec::{
    decode_one, encode, encode_record, record_body_len, FrameReader, FrameStop, RecordHeader,
    FRAME_HEADER_SIZE, MAX_FRAME_BODY,
};
use writeahead::WalError;

// =============================================================================
// Helper Functions
// =============================================================================

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|k| k.to_string()).collect()
}

fn log_of(count: usize) -> (Vec<u8>, Vec<u64>) {
    let mut data = Vec::new();
    let mut lengths = Vec::new();
    for i in 0..count {
        let frame = encode_record(&[format!("key{}", i)], format!("value{}", i).as_bytes()).unwrap();
        lengths.push(frame.len() as u64);
        data.extend(frame);
    }
    (data, lengths)
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_frame_length_matches_layout() {
    let header = RecordHeader { keys: keys(&["a"]) }.to_bytes().unwrap();
    let frame = encode(&[(header.as_slice(), b"payload".as_slice())]).unwrap();

    // header + part count + two length-prefixed parts
    let expected = FRAME_HEADER_SIZE + 4 + (4 + header.len()) + (4 + 7);
    assert_eq!(frame.len(), expected);
}

#[test]
fn test_multi_record_frame() {
    let first = RecordHeader { keys: keys(&["a", "b"]) }.to_bytes().unwrap();
    let second = RecordHeader { keys: keys(&["c"]) }.to_bytes().unwrap();
    let frame = encode(&[
        (first.as_slice(), b"one".as_slice()),
        (second.as_slice(), b"two".as_slice()),
    ])
    .unwrap();

    let decoded = decode_one(Bytes::from(frame)).unwrap();
    let records = decoded.records().unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].keys, keys(&["a", "b"]));
    assert_eq!(&records[0].payload[..], b"one");
    assert_eq!(records[1].keys, keys(&["c"]));
    assert_eq!(&records[1].payload[..], b"two");
}

#[test]
fn test_record_body_len_matches_encoding() {
    for (names, payload) in [(vec!["a"], &b"x"[..]), (vec!["k1", "k2", "k3"], &b""[..])] {
        let keys = keys(&names);
        let frame = encode_record(&keys, payload).unwrap();
        let body = record_body_len(&keys, payload.len()).unwrap();
        assert_eq!(body + FRAME_HEADER_SIZE as u64, frame.len() as u64);
    }
}

#[test]
fn test_oversized_body_is_refused() {
    let keys = keys(&["big"]);
    let size = record_body_len(&keys, MAX_FRAME_BODY as usize).unwrap();
    assert!(size > u64::from(MAX_FRAME_BODY));

    // 257 parts sharing one 1 MB buffer; the size check runs before any copy
    let part = vec![0u8; 1024 * 1024];
    let parts: Vec<(&[u8], &[u8])> = (0..257).map(|_| (&part[..], &b""[..])).collect();
    assert!(matches!(
        encode(&parts),
        Err(WalError::RecordTooLarge { max, .. }) if max == u64::from(MAX_FRAME_BODY)
    ));
}

#[test]
fn test_empty_payload_and_no_keys() {
    let frame = encode_record(&[], b"").unwrap();
    let records = decode_one(Bytes::from(frame)).unwrap().records().unwrap();

    assert_eq!(records.len(), 1);
    assert!(records[0].keys.is_empty());
    assert!(records[0].payload.is_empty());
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_reports_offsets() {
    let (data, lengths) = log_of(5);
    let frames: Vec<_> = FrameReader::new(&data[..])
        .collect::<writeahead::Result<_>>()
        .unwrap();

    assert_eq!(frames.len(), 5);
    let mut offset = 0;
    for (frame, length) in frames.iter().zip(&lengths) {
        assert_eq!(frame.offset, offset);
        assert_eq!(frame.length, *length);
        offset += length;
    }
}

#[test]
fn test_reader_empty_input() {
    let mut reader = FrameReader::new(std::io::empty());
    assert!(reader.next().is_none());
    assert_eq!(reader.valid_len(), 0);
    assert_eq!(reader.stop_reason(), None);
}

#[test]
fn test_reader_stops_at_every_truncation_point() {
    let (data, lengths) = log_of(3);
    let first_two = lengths[0] + lengths[1];

    // Cut the last frame at every possible byte
    for cut in first_two as usize..data.len() {
        let mut reader = FrameReader::new(&data[..cut]);
        let frames = reader.by_ref().count();

        assert_eq!(frames, 2, "cut at {}", cut);
        assert_eq!(reader.valid_len(), first_two);
        if cut as u64 > first_two {
            assert_eq!(reader.stop_reason(), Some(FrameStop::Truncated));
        } else {
            assert_eq!(reader.stop_reason(), None);
        }
    }
}

#[test]
fn test_reader_stops_at_corrupt_middle_frame() {
    let (mut data, lengths) = log_of(3);

    // Flip a payload byte inside the second frame
    let target = (lengths[0] + lengths[1] - 1) as usize;
    data[target] ^= 0x55;

    let mut reader = FrameReader::new(&data[..]);
    assert_eq!(reader.by_ref().count(), 1);
    assert_eq!(reader.valid_len(), lengths[0]);
    assert_eq!(reader.stop_reason(), Some(FrameStop::ChecksumMismatch));
}

#[test]
fn test_reader_rejects_absurd_length() {
    let mut data = vec![0xFF, 0xFF, 0xFF, 0xFF];
    data.extend_from_slice(&[0u8; 12]);

    let mut reader = FrameReader::new(&data[..]);
    assert!(reader.next().is_none());
    assert_eq!(reader.stop_reason(), Some(FrameStop::Malformed));
}

#[test]
fn test_decode_one_rejects_short_block() {
    let frame = encode_record(&keys(&["k"]), b"value").unwrap();
    let short = Bytes::from(frame[..frame.len() - 1].to_vec());

    assert!(matches!(decode_one(short), Err(WalError::Corruption(_))));
}
