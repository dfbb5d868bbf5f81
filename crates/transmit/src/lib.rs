#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Socket transmission primitives for the output-chain engine.
//!
//! This crate is the boundary between the transmission engine and the two
//! underlying send primitives: a vectored memory write (`writev`) and a
//! zero-copy file-to-socket transfer (`sendfile`) that may carry memory
//! header and trailer vectors alongside the file bytes. The two syscalls
//! report progress and errors through different conventions; the
//! [`Transmitter`] trait folds both into one contract:
//!
//! - every call reports the bytes actually sent, even when it also reports
//!   a retryable condition (a partial send before `EINTR`/`EAGAIN` is
//!   common and must not be discarded);
//! - retryable conditions are classified as [`Outcome::Interrupted`] or
//!   [`Outcome::WouldBlock`] rather than surfaced as errors;
//! - any other failure is fatal and returned as `Err(io::Error)`. A fatal
//!   return carries no byte count, so the caller must assume zero bytes
//!   were applied; the design accepts the risk of re-sending bytes the
//!   kernel may already have taken over losing track of buffer cursors.
//!
//! The [`SocketTransmitter`] implementation drives a non-blocking Unix
//! socket and never blocks the calling thread.

use std::fs::File;
use std::io::{self, IoSlice};

/// How a transmission attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The syscall returned without a retryable condition. The byte count
    /// may still be short of what was requested if the socket buffer
    /// filled mid-write.
    Complete,
    /// A signal interrupted the syscall. The caller should retry
    /// immediately with the remaining data.
    Interrupted,
    /// No socket buffer space. The caller should stop and wait for the
    /// next write-readiness notification. A zero-copy transfer can report
    /// this *after* having sent a whole unit, so a nonzero byte count here
    /// is normal.
    WouldBlock,
}

/// Result of one transmission attempt: bytes sent plus the classified
/// stop reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transmitted {
    /// Bytes the kernel accepted during this attempt.
    pub sent: u64,
    /// Why the attempt stopped.
    pub outcome: Outcome,
}

impl Transmitted {
    /// A completed attempt that sent `sent` bytes.
    #[must_use]
    pub const fn complete(sent: u64) -> Self {
        Self {
            sent,
            outcome: Outcome::Complete,
        }
    }
}

/// The two send primitives the transmission engine drives.
///
/// Implementations must be non-blocking: the only acceptable suspension is
/// returning [`Outcome::WouldBlock`].
pub trait Transmitter {
    /// Sends the given memory vectors with a single vectored write.
    ///
    /// A zero-or-negative kernel result with no fatal errno reports zero
    /// bytes sent and [`Outcome::Complete`], not an error.
    ///
    /// # Errors
    ///
    /// Returns any errno other than `EINTR`/`EAGAIN` as a fatal error.
    fn send_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<Transmitted>;

    /// Sends `len` file bytes starting at `offset`, preceded by `header`
    /// vectors and followed by `trailer` vectors, using the platform's
    /// zero-copy path.
    ///
    /// `header_hint` is the header byte count to fold into the kernel's
    /// requested-length parameter on platforms whose `sendfile` expects the
    /// combined header+file total (the historic FreeBSD "nbytes bug").
    /// Platforms that carry the header through separate writes ignore it.
    ///
    /// # Errors
    ///
    /// Returns any errno other than `EINTR`/`EAGAIN` as a fatal error.
    fn send_file(
        &mut self,
        file: &File,
        offset: u64,
        len: u64,
        header_hint: u64,
        header: &[IoSlice<'_>],
        trailer: &[IoSlice<'_>],
    ) -> io::Result<Transmitted>;

    /// Enables the socket's segment-batching mode (`TCP_CORK` /
    /// `TCP_NOPUSH`), so sub-segment writes are withheld until a full
    /// network segment accumulates.
    ///
    /// # Errors
    ///
    /// Returns the `setsockopt` failure. Callers must treat this as fatal:
    /// continuing without batching after deciding to rely on it leaves
    /// sub-segment data sitting behind a delayed flush.
    fn enable_batching(&mut self) -> io::Result<()>;
}

#[cfg(unix)]
mod socket;
#[cfg(unix)]
pub use socket::SocketTransmitter;

/// Sum of the byte lengths of a set of I/O slices.
#[must_use]
pub fn total_len(bufs: &[IoSlice<'_>]) -> u64 {
    bufs.iter().map(|b| b.len() as u64).sum()
}
