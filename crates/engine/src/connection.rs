//! crates/engine/src/connection.rs
//!
//! Per-connection transmission state carried across calls.

use transmit::Transmitter;

/// Persistent per-connection state the engine consumes and mutates.
///
/// One connection is owned by exactly one event-loop thread at a time, so
/// no locking is involved; the engine mutates this state only synchronously
/// within a call.
#[derive(Debug)]
pub struct Connection<T> {
    pub(crate) transmitter: T,
    pub(crate) sent: u64,
    pub(crate) write_ready: bool,
    pub(crate) corked: bool,
}

impl<T: Transmitter> Connection<T> {
    /// Wraps a transmitter for a freshly writable connection.
    pub const fn new(transmitter: T) -> Self {
        Self {
            transmitter,
            sent: 0,
            write_ready: true,
            corked: false,
        }
    }

    /// Cumulative bytes sent over this connection. Monotonic.
    #[must_use]
    pub const fn bytes_sent(&self) -> u64 {
        self.sent
    }

    /// Whether the socket is believed to have outbound buffer space.
    ///
    /// When false the engine refuses to attempt transmission and returns
    /// the chain unchanged.
    #[must_use]
    pub const fn is_write_ready(&self) -> bool {
        self.write_ready
    }

    /// Records a write-readiness transition reported by the reactor.
    ///
    /// The engine clears readiness itself on backpressure; only the
    /// reactor sets it back once the OS reports the socket writable.
    pub fn set_write_ready(&mut self, ready: bool) {
        self.write_ready = ready;
    }

    /// Whether segment batching has been enabled on this connection.
    #[must_use]
    pub const fn is_corked(&self) -> bool {
        self.corked
    }
}
