//! Framing Codec
//!
//! Makes records self-describing and detects torn or corrupted writes.
//!
//! ## Responsibilities
//! - Encode one or more `(header, payload)` pairs into a checksummed frame
//! - Decode a byte stream lazily, stopping at the first bad trailing frame
//! - Encode the key set of a record (bincode)
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Frame 1                                              │
//! │ ┌──────────┬─────────┬─────────────────────────────┐ │
//! │ │ Len (4)  │ CRC (4) │ Body                        │ │
//! │ └──────────┴─────────┴─────────────────────────────┘ │
//! │   Body: Parts (4) + (PartLen (4) + Part)*            │
//! ├──────────────────────────────────────────────────────┤
//! │ Frame 2                                              │
//! │ ...                                                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! A record is always two parts: the bincode `RecordHeader` and the payload.

mod frame;
mod reader;

pub use frame::{encode, encode_record, record_body_len, Record, RecordHeader};
pub use reader::{decode_one, Frame, FrameReader, FrameStop};

/// Frame header size: 4 bytes body length + 4 bytes CRC32
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest body a frame may declare (256 MB)
pub const MAX_FRAME_BODY: u32 = 256 * 1024 * 1024;
