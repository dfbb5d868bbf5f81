//! crates/engine/src/config.rs
//!
//! Platform-quirk toggles, passed explicitly instead of living in process
//! globals.

/// Tunables for platform behaviors the hot path must honor.
#[derive(Debug, Clone)]
pub struct SendConfig {
    /// Enable the one-time segment-batching socket option before the first
    /// zero-copy file send on a connection.
    ///
    /// Batching withholds sub-segment writes until a full network segment
    /// accumulates, so the response header and the first file page share a
    /// packet instead of going out as two undersized ones. Disable on
    /// platforms or kernel versions where turning the option off later
    /// fails to flush pending sub-segment data promptly.
    pub tcp_batching: bool,
    /// Fold the header byte count into the zero-copy call's requested
    /// length.
    ///
    /// Some `sendfile` variants only honor a length parameter that covers
    /// the header vectors too; on others the headers must not count toward
    /// it. When disabled, the hint passed to the adapter is zero and the
    /// header bytes ride solely through their own vectors.
    pub hint_includes_header: bool,
}

impl SendConfig {
    /// Defaults: batching on, combined-length hint on.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tcp_batching: true,
            hint_includes_header: true,
        }
    }
}

impl Default for SendConfig {
    fn default() -> Self {
        Self::new()
    }
}
