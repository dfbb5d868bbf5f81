#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Output buffer chain model and scatter-gather coalescing.
//!
//! A server's pending output for one connection is an ordered [`Chain`] of
//! [`Span`]s: in-memory byte ranges, byte ranges inside on-disk files, and
//! zero-length flush markers. This crate owns the data model and the
//! coalescing pass that groups a chain into the minimal scatter-gather
//! shape a single transmission attempt can cover:
//!
//! - a leading run of memory spans merged into iovec-style header entries,
//! - at most one contiguous file region,
//! - a trailing run of memory spans merged the same way,
//! - and the index of the first span the attempt will not touch.
//!
//! Two memory spans merge into one entry only when they are logically
//! adjacent: they share the same origin buffer and the first ends exactly
//! where the second begins. Two file spans merge only when they name the
//! same file and their offsets are strictly contiguous. A gap of any size
//! starts a new entry or stops the file region.
//!
//! Chains are produced and owned by the protocol layer; the transmission
//! engine only advances per-span cursors and the chain head. Spans that the
//! head has passed stay in the chain until the producer drains them with
//! [`Chain::reclaim`].

mod chain;
mod coalesce;
mod span;

pub use crate::chain::Chain;
pub use crate::coalesce::{FileRegion, IovecEntry, MAX_COALESCE_IOVS, SendBatch, coalesce};
pub use crate::span::{FileSpan, MemorySpan, Span};
