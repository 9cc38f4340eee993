//! Coordinator Module
//!
//! Single point of serialization for every request against the log.
//!
//! ## Concurrency Model
//!
//! - Callers submit `Request`s on a bounded multi-producer channel
//! - One coordinator thread processes them one at a time, in arrival order
//! - Every mutation of the chain or of the active segment's index
//!   happens-before the next request is dequeued
//! - Appends are handed to the batching writer over a second channel, in the
//!   same order, so acceptance order is also on-disk order
//!
//! ```text
//!   callers ──► [ request queue ] ──► Coordinator ──► [ writer queue ] ──► BatchWriter
//!                                        │                                     │
//!                                        ▼                                     ▼
//!                                  SegmentChain                          active file
//! ```

mod request;
mod worker;

pub(crate) use request::Request;
pub(crate) use worker::Coordinator;
