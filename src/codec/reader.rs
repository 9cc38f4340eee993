//! Frame decoding
//!
//! Walks a byte stream frame by frame without loading it whole. Iteration
//! ends at the first frame that is incomplete or fails its checksum, which
//! is exactly the state a crash in the middle of an append leaves behind.

use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;

use crate::error::{Result, WalError};

use super::frame::{Record, RecordHeader};
use super::{FRAME_HEADER_SIZE, MAX_FRAME_BODY};

/// One decoded frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Byte offset of the frame within the stream
    pub offset: u64,

    /// Encoded length of the frame, header included
    pub length: u64,

    /// Raw parts in encoding order
    pub parts: Vec<Bytes>,
}

impl Frame {
    /// Interpret the parts as `(RecordHeader, payload)` pairs
    pub fn records(&self) -> Result<Vec<Record>> {
        if self.parts.len() % 2 != 0 {
            return Err(WalError::Corruption(format!(
                "frame at offset {} has an odd part count ({})",
                self.offset,
                self.parts.len()
            )));
        }

        self.parts
            .chunks(2)
            .map(|pair| {
                let header = RecordHeader::from_bytes(&pair[0])?;
                Ok(Record {
                    keys: header.keys,
                    payload: pair[1].clone(),
                })
            })
            .collect()
    }
}

/// Why a reader stopped before the end of its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStop {
    /// Header or body shorter than declared
    Truncated,

    /// Body does not match its CRC
    ChecksumMismatch,

    /// Checksum passed but the body could not be parsed
    Malformed,
}

impl fmt::Display for FrameStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameStop::Truncated => write!(f, "truncated frame"),
            FrameStop::ChecksumMismatch => write!(f, "checksum mismatch"),
            FrameStop::Malformed => write!(f, "malformed frame body"),
        }
    }
}

/// Iterator over the valid frames of a stream
///
/// Bad trailing data ends iteration and is reported by
/// [`stop_reason`](FrameReader::stop_reason); only I/O failures of the
/// underlying reader surface as `Err` items.
pub struct FrameReader<R> {
    reader: R,
    offset: u64,
    stop: Option<FrameStop>,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            stop: None,
            done: false,
        }
    }

    /// Number of leading bytes made of complete, verified frames
    pub fn valid_len(&self) -> u64 {
        self.offset
    }

    /// Set once iteration has ended on a bad trailing frame
    pub fn stop_reason(&self) -> Option<FrameStop> {
        self.stop
    }

    fn read_frame(&mut self) -> io::Result<Option<Frame>> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        let filled = read_full(&mut self.reader, &mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < FRAME_HEADER_SIZE {
            return Ok(self.halt(FrameStop::Truncated));
        }

        let (body_len, crc) = parse_header(&header);
        if body_len > MAX_FRAME_BODY {
            return Ok(self.halt(FrameStop::Malformed));
        }

        // Grows with the data actually present, so a garbage length never
        // allocates up front
        let mut body = Vec::new();
        let read = (&mut self.reader)
            .take(u64::from(body_len))
            .read_to_end(&mut body)?;
        if read < body_len as usize {
            return Ok(self.halt(FrameStop::Truncated));
        }

        let parts = match verify_body(Bytes::from(body), crc) {
            Ok(parts) => parts,
            Err(stop) => return Ok(self.halt(stop)),
        };

        let length = (FRAME_HEADER_SIZE as u64) + u64::from(body_len);
        let frame = Frame {
            offset: self.offset,
            length,
            parts,
        };
        self.offset += length;
        Ok(Some(frame))
    }

    fn halt(&mut self, stop: FrameStop) -> Option<Frame> {
        self.stop = Some(stop);
        None
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Result<Frame>> {
        if self.done {
            return None;
        }

        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err.into()))
            }
        }
    }
}

/// Decode exactly one frame occupying all of `bytes`
///
/// Used to re-read a block from its recorded position and length.
pub fn decode_one(bytes: Bytes) -> Result<Frame> {
    let corrupt = |stop: FrameStop| WalError::Corruption(format!("block did not decode: {}", stop));

    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(corrupt(FrameStop::Truncated));
    }

    let (body_len, crc) = parse_header(&bytes[..FRAME_HEADER_SIZE]);
    let length = FRAME_HEADER_SIZE + body_len as usize;
    if body_len > MAX_FRAME_BODY {
        return Err(corrupt(FrameStop::Malformed));
    }
    if length != bytes.len() {
        return Err(WalError::Corruption(format!(
            "block length mismatch: frame is {} bytes, read {}",
            length,
            bytes.len()
        )));
    }

    let parts = verify_body(bytes.slice(FRAME_HEADER_SIZE..), crc).map_err(corrupt)?;

    Ok(Frame {
        offset: 0,
        length: length as u64,
        parts,
    })
}

// =============================================================================
// Private Helpers
// =============================================================================

fn parse_header(header: &[u8]) -> (u32, u32) {
    let body_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (body_len, crc)
}

fn verify_body(body: Bytes, crc: u32) -> std::result::Result<Vec<Bytes>, FrameStop> {
    if crc32fast::hash(&body) != crc {
        return Err(FrameStop::ChecksumMismatch);
    }
    parse_parts(&body).ok_or(FrameStop::Malformed)
}

/// Fill `buf` as far as the stream allows; short only at end of stream
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn parse_parts(body: &Bytes) -> Option<Vec<Bytes>> {
    let count = read_u32(body, 0)? as usize;
    let mut pos = 4;

    // Every part needs at least its 4 byte length prefix
    if count > (body.len() - pos) / 4 {
        return None;
    }

    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_u32(body, pos)? as usize;
        pos += 4;
        if body.len() - pos < len {
            return None;
        }
        parts.push(body.slice(pos..pos + len));
        pos += len;
    }

    if pos != body.len() {
        return None;
    }
    Some(parts)
}

fn read_u32(bytes: &[u8], pos: usize) -> Option<u32> {
    let raw = bytes.get(pos..pos + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
