//! Frame encoding
//!
//! Turns records into checksummed frames ready for a sequential append.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalError};

use super::{FRAME_HEADER_SIZE, MAX_FRAME_BODY};

/// First part of every record: the keys the payload is indexed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub keys: Vec<String>,
}

impl RecordHeader {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub keys: Vec<String>,
    pub payload: Bytes,
}

/// Encode a list of `(header, payload)` pairs into one frame
///
/// Format: body_len (4) + crc32(body) (4) + body, where body is
/// part_count (4) followed by each part as len (4) + bytes.
///
/// Fails with `RecordTooLarge` when the body would exceed [`MAX_FRAME_BODY`],
/// which readers would otherwise reject as malformed.
pub fn encode(records: &[(&[u8], &[u8])]) -> Result<Vec<u8>> {
    let body_len = 4 + records
        .iter()
        .map(|(header, payload)| 8 + header.len() + payload.len())
        .sum::<usize>();
    check_body_len(body_len as u64)?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + body_len);
    frame.extend_from_slice(&(body_len as u32).to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes()); // CRC placeholder

    frame.extend_from_slice(&((records.len() * 2) as u32).to_le_bytes());
    for (header, payload) in records {
        frame.extend_from_slice(&(header.len() as u32).to_le_bytes());
        frame.extend_from_slice(header);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(payload);
    }

    let crc = crc32fast::hash(&frame[FRAME_HEADER_SIZE..]);
    frame[4..8].copy_from_slice(&crc.to_le_bytes());

    Ok(frame)
}

/// Encode a single keyed record as its own frame
pub fn encode_record(keys: &[String], payload: &[u8]) -> Result<Vec<u8>> {
    let header = RecordHeader {
        keys: keys.to_vec(),
    }
    .to_bytes()?;
    encode(&[(header.as_slice(), payload)])
}

/// Body size of the frame `encode_record` would produce, without encoding it
pub fn record_body_len(keys: &[String], payload_len: usize) -> Result<u64> {
    let header_len = bincode::serialized_size(&RecordHeader {
        keys: keys.to_vec(),
    })?;
    // part count + two length-prefixed parts
    Ok(4 + 4 + header_len + 4 + payload_len as u64)
}

fn check_body_len(body_len: u64) -> Result<()> {
    if body_len > u64::from(MAX_FRAME_BODY) {
        return Err(WalError::RecordTooLarge {
            size: body_len,
            max: u64::from(MAX_FRAME_BODY),
        });
    }
    Ok(())
}
