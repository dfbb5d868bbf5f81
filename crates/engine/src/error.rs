//! crates/engine/src/error.rs
//!
//! Fatal outcomes of a transmission call.

use std::io;

use thiserror::Error;

/// Result type for transmission calls.
pub type SendResult<T> = Result<T, SendError>;

/// Fatal transmission failures.
///
/// Retryable conditions (`EINTR`, `EAGAIN`) never surface here; they are
/// absorbed by the engine's retry loop or returned as normal backpressure.
/// After any of these errors the connection must be considered unusable
/// for further writes and torn down by the caller.
#[derive(Debug, Error)]
pub enum SendError {
    /// Enabling the segment-batching socket option failed before the first
    /// zero-copy send. Nothing was transmitted for the current unit.
    #[error("failed to enable segment batching: {0}")]
    Batching(#[source] io::Error),
    /// A send primitive failed with a non-retryable errno. Bytes applied
    /// by earlier attempts in the same call remain applied; the failing
    /// attempt itself is counted as zero sent.
    #[error("chain transmission failed: {0}")]
    Transmit(#[source] io::Error),
}
