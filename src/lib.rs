//! # writeahead
//!
//! A segmented write-ahead log with:
//! - Ordered, checksummed appends (acceptance order = on-disk order)
//! - Batched writes: concurrent writers share one append per batch
//! - Per-segment key indexes for latest-value lookups without replay
//! - Segment rotation and retirement
//! - Crash recovery with torn-tail truncation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        WriteAhead                            │
//! │          write / get / rotate / shift / read / head          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ request queue
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Coordinator                             │
//! │                (one request at a time)                       │
//! └──────────┬─────────────────────────────────┬────────────────┘
//!            │ index                           │ writer queue
//!            ▼                                 ▼
//!   ┌─────────────────┐               ┌─────────────────┐
//!   │  SegmentChain   │               │   BatchWriter   │
//!   │   (RwLock)      │               │   + Appender    │
//!   └─────────────────┘               └────────┬────────┘
//!                                              │ frames
//!                                              ▼
//!                                     ┌─────────────────┐
//!                                     │ segment files   │
//!                                     │ 0, 1, ... N     │
//!                                     └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use writeahead::{Config, WriteAhead};
//!
//! let log = WriteAhead::open(Config::builder().directory("./wal").build())?;
//!
//! let durable = log.write(["user:1"], &b"alice"[..])?;
//! let position = durable.wait()?;
//!
//! let block = log.get("user:1")?.expect("just written");
//! assert_eq!(&block.payload()[..], b"alice");
//! # let _ = position;
//! # Ok::<(), writeahead::WalError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod segment;
pub mod writer;
mod coordinator;
pub mod writeahead;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, WalError};
pub use config::{Config, SyncStrategy};
pub use segment::{Block, Entry, Placement, RecoveryReport};
pub use writer::Durable;
pub use writeahead::WriteAhead;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of writeahead
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
