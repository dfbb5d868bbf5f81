//! crates/chain/src/span.rs
//!
//! Buffer span descriptors: the unit of pending output.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::sync::Arc;

/// A contiguous run of bytes inside a shared origin buffer.
///
/// The origin buffer is reference-counted so that several spans (and the
/// coalesced entries built from them) can point into the same allocation.
/// The `[pos, last)` cursor pair tracks consumption: `pos` advances as bytes
/// are transmitted and the span is exhausted when `pos == last`.
#[derive(Debug, Clone)]
pub struct MemorySpan {
    origin: Arc<[u8]>,
    pos: usize,
    last: usize,
}

impl MemorySpan {
    /// Creates a span covering the whole origin buffer.
    #[must_use]
    pub fn new(origin: Arc<[u8]>) -> Self {
        let last = origin.len();
        Self {
            origin,
            pos: 0,
            last,
        }
    }

    /// Creates a span covering `[pos, last)` of the origin buffer.
    ///
    /// # Panics
    ///
    /// Panics if `pos > last` or `last > origin.len()`.
    #[must_use]
    pub fn slice(origin: Arc<[u8]>, pos: usize, last: usize) -> Self {
        assert!(pos <= last, "span cursor {pos} past limit {last}");
        assert!(
            last <= origin.len(),
            "span limit {last} past origin length {}",
            origin.len()
        );
        Self { origin, pos, last }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        (self.last - self.pos) as u64
    }

    /// Whether the cursor has reached the limit.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.last
    }

    /// The unconsumed bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.origin[self.pos..self.last]
    }

    /// Current cursor offset within the origin buffer.
    #[must_use]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Limit offset within the origin buffer.
    #[must_use]
    pub const fn last(&self) -> usize {
        self.last
    }

    /// Advances the cursor by `n` consumed bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the remaining size.
    pub fn advance(&mut self, n: u64) {
        assert!(n <= self.remaining(), "advance past span limit");
        self.pos += n as usize;
    }

    /// Logical adjacency: same origin buffer and this span ends exactly
    /// where `next` begins. Replaces the raw pointer comparison a C
    /// implementation would use for iovec merging.
    #[must_use]
    pub fn precedes(&self, next: &Self) -> bool {
        Arc::ptr_eq(&self.origin, &next.origin) && self.last == next.pos
    }

    pub(crate) fn origin_arc(&self) -> &Arc<[u8]> {
        &self.origin
    }
}

/// A byte range `[file_pos, file_last)` inside an open file.
///
/// The handle is reference-counted because the producer typically submits
/// several spans over one open file. Identity for coalescing purposes is
/// the underlying file descriptor.
#[derive(Debug, Clone)]
pub struct FileSpan {
    file: Arc<File>,
    file_pos: u64,
    file_last: u64,
}

impl FileSpan {
    /// Creates a span covering `[file_pos, file_last)` of `file`.
    ///
    /// # Panics
    ///
    /// Panics if `file_pos > file_last`.
    #[must_use]
    pub fn new(file: Arc<File>, file_pos: u64, file_last: u64) -> Self {
        assert!(
            file_pos <= file_last,
            "file cursor {file_pos} past limit {file_last}"
        );
        Self {
            file,
            file_pos,
            file_last,
        }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.file_last - self.file_pos
    }

    /// Whether the cursor has reached the limit.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.file_pos == self.file_last
    }

    /// The open file this span reads from.
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Current cursor offset within the file.
    #[must_use]
    pub const fn file_pos(&self) -> u64 {
        self.file_pos
    }

    /// Limit offset within the file.
    #[must_use]
    pub const fn file_last(&self) -> u64 {
        self.file_last
    }

    /// Advances the cursor by `n` consumed bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the remaining size.
    pub fn advance(&mut self, n: u64) {
        assert!(n <= self.remaining(), "advance past span limit");
        self.file_pos += n;
    }

    /// Whether `next` continues this span: same descriptor and its start
    /// offset equals this span's limit. A gap or a different file stops
    /// region coalescing.
    #[must_use]
    pub fn precedes(&self, next: &Self) -> bool {
        self.same_file(next) && self.file_last == next.file_pos
    }

    pub(crate) fn same_file(&self, other: &Self) -> bool {
        self.file.as_raw_fd() == other.file.as_raw_fd()
    }

    pub(crate) fn file_arc(&self) -> &Arc<File> {
        &self.file
    }
}

/// One descriptor in an output chain.
#[derive(Debug, Clone)]
pub enum Span {
    /// In-memory bytes awaiting transmission.
    Memory(MemorySpan),
    /// Bytes inside an on-disk file, transmitted via the zero-copy path.
    File(FileSpan),
    /// Zero-length flush boundary. Carries no transmissible bytes, is never
    /// coalesced or advanced, and is skipped (but kept in order) by every
    /// scan; its meaning belongs to the producer.
    Flush,
}

impl Span {
    /// Remaining transmissible bytes. Flush markers report zero.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        match self {
            Self::Memory(m) => m.remaining(),
            Self::File(f) => f.remaining(),
            Self::Flush => 0,
        }
    }

    /// Whether this is a zero-length marker span.
    #[must_use]
    pub const fn is_special(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Advances the span's cursor by `n` consumed bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the remaining size. Marker spans only accept
    /// `n == 0`.
    pub fn advance(&mut self, n: u64) {
        match self {
            Self::Memory(m) => m.advance(n),
            Self::File(f) => f.advance(n),
            Self::Flush => assert_eq!(n, 0, "marker spans carry no bytes"),
        }
    }

    /// Moves the cursor to the limit, marking the span fully consumed.
    pub fn consume_all(&mut self) {
        let n = self.remaining();
        self.advance(n);
    }
}
