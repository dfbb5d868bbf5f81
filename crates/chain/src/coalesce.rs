//! crates/chain/src/coalesce.rs
//!
//! Groups a chain prefix into the shape one transmission attempt covers.

use std::fs::File;
use std::sync::Arc;

use crate::span::Span;

/// Maximum header or trailer iovec entries per transmission attempt.
///
/// Matches the pre-sized accounting arrays of classic chain writers. When a
/// scan would exceed the cap it stops there and the overflowing span becomes
/// the tail of the attempt.
pub const MAX_COALESCE_IOVS: usize = 10;

/// One scatter-gather entry: a contiguous range of an origin buffer built
/// by merging logically adjacent memory spans.
#[derive(Debug, Clone)]
pub struct IovecEntry {
    origin: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl IovecEntry {
    /// The bytes this entry covers.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.origin[self.start..self.end]
    }

    /// Entry length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        (self.end - self.start) as u64
    }

    /// Whether the entry covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A merged contiguous byte range within one file, built from consecutive
/// file spans that share a descriptor and touch end-to-start.
#[derive(Debug, Clone)]
pub struct FileRegion {
    file: Arc<File>,
    offset: u64,
    len: u64,
}

impl FileRegion {
    /// The open file the region reads from.
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Start offset within the file.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Region length in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Whether the region covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The coalesced plan for a single transmission attempt.
#[derive(Debug)]
pub struct SendBatch {
    header: Vec<IovecEntry>,
    file: Option<FileRegion>,
    trailer: Vec<IovecEntry>,
    tail: usize,
}

impl SendBatch {
    /// Memory entries sent ahead of the file region (or alone when there is
    /// no file region).
    #[must_use]
    pub fn header(&self) -> &[IovecEntry] {
        &self.header
    }

    /// The merged file region, if the scanned prefix contained file spans.
    #[must_use]
    pub const fn file(&self) -> Option<&FileRegion> {
        self.file.as_ref()
    }

    /// Memory entries sent after the file region.
    #[must_use]
    pub fn trailer(&self) -> &[IovecEntry] {
        &self.trailer
    }

    /// Index (into the scanned slice) of the first span this attempt does
    /// not cover. Equals the slice length when the whole prefix is covered.
    #[must_use]
    pub const fn tail(&self) -> usize {
        self.tail
    }

    /// Total header bytes.
    #[must_use]
    pub fn header_bytes(&self) -> u64 {
        self.header.iter().map(IovecEntry::len).sum()
    }

    /// Total trailer bytes.
    #[must_use]
    pub fn trailer_bytes(&self) -> u64 {
        self.trailer.iter().map(IovecEntry::len).sum()
    }

    /// Whether the attempt has nothing to transmit (the scanned prefix held
    /// only markers or nothing at all).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.file.is_none() && self.trailer.is_empty()
    }
}

/// Walks `spans` from the front and produces the scatter-gather plan for
/// one transmission attempt: merged header entries, at most one contiguous
/// file region, merged trailer entries, and the tail index.
///
/// Marker spans are skipped without breaking an adjacency run. Memory spans
/// merge into the previous entry only when logically adjacent; file spans
/// extend the region only when they name the same descriptor and start
/// exactly at its running end.
#[must_use]
pub fn coalesce(spans: &[Span]) -> SendBatch {
    let mut header = Vec::new();
    let mut capped = false;

    let mut i = scan_memory(spans, 0, &mut header, &mut capped);
    if capped {
        // A full header with no file region must stay a pure vectored
        // write; everything from the overflow onward waits for the next
        // attempt.
        return SendBatch {
            header,
            file: None,
            trailer: Vec::new(),
            tail: i,
        };
    }

    let mut file = None;
    if let Some(Span::File(first)) = spans.get(i) {
        let mut region = FileRegion {
            file: Arc::clone(first.file_arc()),
            offset: first.file_pos(),
            len: first.remaining(),
        };
        i += 1;

        while let Some(Span::File(next)) = spans.get(i) {
            if !next.same_file(first) || region.offset + region.len != next.file_pos() {
                break;
            }
            region.len += next.remaining();
            i += 1;
        }
        file = Some(region);
    }

    let mut trailer = Vec::new();
    let tail = scan_memory(spans, i, &mut trailer, &mut capped);

    SendBatch {
        header,
        file,
        trailer,
        tail,
    }
}

/// Accumulates consecutive memory spans starting at `i` into `out`,
/// merging adjacent ones. Returns the index of the span that stopped the
/// scan (a file span, the cap overflow, or the slice end).
fn scan_memory(
    spans: &[Span],
    mut i: usize,
    out: &mut Vec<IovecEntry>,
    capped: &mut bool,
) -> usize {
    while i < spans.len() {
        match &spans[i] {
            Span::Flush => {
                // Markers do not reset adjacency: spans on either side of
                // one can still merge.
                i += 1;
            }
            Span::Memory(m) => {
                if let Some(prev) = out.last_mut() {
                    if Arc::ptr_eq(&prev.origin, m.origin_arc()) && prev.end == m.pos() {
                        prev.end = m.last();
                        i += 1;
                        continue;
                    }
                }
                if out.len() == MAX_COALESCE_IOVS {
                    *capped = true;
                    break;
                }
                out.push(IovecEntry {
                    origin: Arc::clone(m.origin_arc()),
                    start: m.pos(),
                    end: m.last(),
                });
                i += 1;
            }
            Span::File(_) => break,
        }
    }
    i
}
