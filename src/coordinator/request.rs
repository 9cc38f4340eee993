//! Request definitions
//!
//! Represents operations submitted to the coordinator.

#[cfg(test)]
use std::fs::File;
use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::Sender;

use crate::error::Result;
use crate::segment::{Block, Segment};
use crate::writer::Durable;

/// A request to the coordinator, each carrying its reply channel
pub(crate) enum Request {
    /// Index a block in the active segment and queue it for append.
    /// The reply is the "enqueued" acknowledgment.
    Write {
        keys: Vec<String>,
        payload: Bytes,
        sync: bool,
        reply: Sender<Result<Durable>>,
    },

    /// Most recent live block for a key and the segment holding it; the
    /// caller loads the payload
    Get {
        key: String,
        reply: Sender<Option<(Arc<Segment>, Arc<Block>)>>,
    },

    /// Open a new active segment; replies with its id
    Rotate { reply: Sender<Result<u64>> },

    /// Retire the oldest segment; replies with its id, or `None` if only the
    /// active segment remains
    Shift { reply: Sender<Result<Option<u64>>> },

    /// Replies with the sequence number of the last accepted write
    Flush { reply: Sender<u64> },

    /// Point the writer at another handle for the active segment
    #[cfg(test)]
    SwapFile { file: File, reply: Sender<()> },
}

impl Request {
    /// Operation name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Write { .. } => "write",
            Request::Get { .. } => "get",
            Request::Rotate { .. } => "rotate",
            Request::Shift { .. } => "shift",
            Request::Flush { .. } => "flush",
            #[cfg(test)]
            Request::SwapFile { .. } => "swap_file",
        }
    }
}
