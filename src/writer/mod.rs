//! Writer Module
//!
//! Turns queued writes into sequential appends on the active segment.
//!
//! ## Responsibilities
//! - Coalesce concurrent writes into a single append per drained batch
//! - Assign each write the byte offset of its frame
//! - Deliver each write's result in submission order
//! - Rebind to a new file when the coordinator rotates
//!
//! ## Batch Layout
//! ```text
//!  offset before batch
//!  │
//!  ▼
//!  ┌──────────┬──────────┬──────────┬─────┐
//!  │ frame w0 │ frame w1 │ frame w2 │ ... │   one write_all()
//!  └──────────┴──────────┴──────────┴─────┘
//!  pos(w1) = pos(w0) + len(w0), and so on
//! ```

mod appender;
mod batch;
mod completion;

pub use appender::Appender;
pub use batch::BatchWriter;
pub use completion::{Durable, Watermark};

pub(crate) use batch::WriterTask;
pub(crate) use completion::PendingWrite;
