#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Output-chain transmission engine.
//!
//! Given a connection and an ordered chain of pending output spans, the
//! engine transmits as much as the socket currently allows and reports how
//! far it got. Each pass through the internal loop coalesces the chain's
//! front into one transmission unit (header vectors, at most one file
//! region, trailer vectors), picks a strategy — a pure vectored write, or
//! the zero-copy file path with the memory vectors riding alongside — and
//! applies the kernel's byte count back onto the original spans.
//!
//! The loop keeps going while the socket stays writable: a signal
//! interruption retries immediately, a fully flushed unit rolls straight
//! into the next one without another reactor round trip, and `EAGAIN` or a
//! short send parks the connection until the reactor reports
//! write-readiness again.
//!
//! When a chain contains a file region the engine enables the connection's
//! segment-batching mode (`TCP_CORK`/`TCP_NOPUSH`) once, before the first
//! zero-copy send. Without it the kernel tends to emit the header and the
//! first file page as separate undersized segments; with it they leave in
//! full packets. The toggle is never turned off by this layer.

mod config;
mod connection;
mod error;
mod send;

pub use crate::config::SendConfig;
pub use crate::connection::Connection;
pub use crate::error::{SendError, SendResult};
pub use crate::send::send_chain;
