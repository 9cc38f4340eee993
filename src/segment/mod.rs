//! Segment Module
//!
//! One append-only log file per segment, each with an in-memory index from
//! key to the blocks written under that key.
//!
//! ## Responsibilities
//! - Own every block of a segment in a single arena
//! - Index blocks by key in write order
//! - Load written payloads back from the segment file on demand
//! - Track the active → read-only → retired lifecycle
//! - Discover and replay segment files on startup
//!
//! ## Lifecycle
//! ```text
//!   ┌────────┐   rotate    ┌───────────┐   shift    ┌─────────┐
//!   │ Active │ ──────────► │ Read-only │ ─────────► │ Retired │
//!   └────────┘             └───────────┘            └─────────┘
//! ```
//!
//! Only the last segment of the chain is active. Shifting only ever removes
//! the oldest segment, and never the active one.

mod block;
mod chain;
pub mod directory;
mod index;
mod recovery;

pub use block::{Block, Entry, Placement};
pub use chain::SegmentChain;
pub use index::{Segment, SegmentState};
pub use recovery::{recover, replay_segment, RecoveryReport, ReplayedSegment};
