//! crates/engine/src/send.rs
//!
//! The transmission loop: coalesce, choose a strategy, transmit, apply.

use std::io::IoSlice;

use chain::{Chain, SendBatch, Span, coalesce};
use transmit::{Outcome, Transmitted, Transmitter};

use crate::config::SendConfig;
use crate::connection::Connection;
use crate::error::{SendError, SendResult};

/// Transmits as much of `chain` as the socket currently allows.
///
/// Returns once the socket blocks, a fatal error occurs, or the planned
/// transmission unit could not be fully flushed; a fully flushed unit rolls
/// straight into the next one. On return the chain head marks the first
/// unsent span — the caller resumes from exactly there on the next
/// write-readiness signal.
///
/// If the connection is not write-ready this is a no-op: the chain is left
/// untouched and no syscall is made.
///
/// # Errors
///
/// [`SendError::Batching`] if the one-time segment-batching toggle could
/// not be enabled; [`SendError::Transmit`] for any non-retryable send
/// failure. Either way the connection must be torn down by the caller, and
/// the chain is left at its last successfully applied state.
pub fn send_chain<T: Transmitter>(
    conn: &mut Connection<T>,
    chain: &mut Chain,
    config: &SendConfig,
) -> SendResult<()> {
    if !conn.write_ready {
        return Ok(());
    }

    loop {
        let unsent = chain.unsent();
        if unsent.is_empty() {
            break;
        }
        let scanned = unsent.len();

        let batch = coalesce(unsent);
        if batch.is_empty() {
            // Nothing transmissible ahead of the tail: markers never block
            // the chain, so step past them and stop.
            chain.advance_head(batch.tail());
            break;
        }

        let transmitted = transmit_batch(conn, &batch, config)?;

        conn.sent += transmitted.sent;
        let stop = apply_sent(chain.unsent_mut(), transmitted.sent);
        chain.advance_head(stop);

        tracing::debug!(
            sent = transmitted.sent,
            outcome = ?transmitted.outcome,
            total = conn.sent,
            "transmission attempt"
        );

        match transmitted.outcome {
            Outcome::WouldBlock => {
                // The zero-copy path can report EAGAIN after already
                // pushing a whole unit; a retry now would send nothing, so
                // this is terminal for the call even with nonzero bytes.
                conn.write_ready = false;
                return Ok(());
            }
            Outcome::Interrupted => continue,
            Outcome::Complete => {
                // Keep going only when the planned unit was entirely
                // flushed and more of the chain waits behind it.
                let unit_flushed = batch.tail() < scanned && stop == batch.tail();
                if !unit_flushed {
                    break;
                }
            }
        }
    }

    if !chain.is_empty() {
        // A short send inside a unit means the socket is saturated.
        conn.write_ready = false;
    }
    Ok(())
}

/// Chooses the strategy for one coalesced unit and invokes the adapter.
fn transmit_batch<T: Transmitter>(
    conn: &mut Connection<T>,
    batch: &SendBatch,
    config: &SendConfig,
) -> SendResult<Transmitted> {
    let header: Vec<IoSlice<'_>> = batch.header().iter().map(|e| IoSlice::new(e.as_slice())).collect();

    let Some(region) = batch.file() else {
        // File-less chains collapse into a single memory run; a pure
        // vectored write covers the whole unit.
        return conn
            .transmitter
            .send_vectored(&header)
            .map_err(SendError::Transmit);
    };

    if config.tcp_batching && !conn.corked {
        conn.transmitter
            .enable_batching()
            .map_err(SendError::Batching)?;
        conn.corked = true;
    }

    let trailer: Vec<IoSlice<'_>> = batch
        .trailer()
        .iter()
        .map(|e| IoSlice::new(e.as_slice()))
        .collect();
    let header_hint = if config.hint_includes_header {
        batch.header_bytes()
    } else {
        0
    };

    conn.transmitter
        .send_file(
            region.file(),
            region.offset(),
            region.len(),
            header_hint,
            &header,
            &trailer,
        )
        .map_err(SendError::Transmit)
}

/// Applies a sent-byte count back onto the original, uncoalesced spans.
///
/// Walks from the front: markers are passed over, fully covered spans have
/// their cursors moved to the limit, and the first partially covered span
/// advances by the leftover count and stops the walk. Returns the index of
/// the span where scanning stopped — the new chain head.
fn apply_sent(spans: &mut [Span], mut sent: u64) -> usize {
    let mut i = 0;
    while i < spans.len() {
        if spans[i].is_special() {
            i += 1;
            continue;
        }
        if sent == 0 {
            break;
        }

        let size = spans[i].remaining();
        if sent >= size {
            sent -= size;
            spans[i].consume_all();
            i += 1;
            continue;
        }

        spans[i].advance(sent);
        break;
    }
    i
}
