//! crates/chain/src/chain.rs
//!
//! Producer-owned ordered sequence of spans with a consumption head.

use crate::span::Span;

/// An ordered sequence of [`Span`]s awaiting transmission on one connection.
///
/// The producer appends spans; the transmission engine advances per-span
/// cursors and the head index as bytes are confirmed sent. Order is
/// semantically significant and is never changed, only truncated from the
/// front. Spans behind the head stay allocated until the producer calls
/// [`Chain::reclaim`]; the engine never destroys them.
#[derive(Debug, Default)]
pub struct Chain {
    spans: Vec<Span>,
    head: usize,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spans: Vec::new(),
            head: 0,
        }
    }

    /// Appends a span at the end of the chain.
    pub fn push(&mut self, span: Span) {
        self.spans.push(span);
    }

    /// The spans not yet passed by the consumption head, in order.
    #[must_use]
    pub fn unsent(&self) -> &[Span] {
        &self.spans[self.head..]
    }

    /// Mutable view of the unsent spans, for cursor application.
    pub fn unsent_mut(&mut self) -> &mut [Span] {
        &mut self.spans[self.head..]
    }

    /// Moves the head forward by `n` spans.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the number of unsent spans.
    pub fn advance_head(&mut self, n: usize) {
        assert!(
            self.head + n <= self.spans.len(),
            "head advanced past chain end"
        );
        self.head += n;
    }

    /// Whether every span has been passed by the head.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head == self.spans.len()
    }

    /// Total transmissible bytes remaining ahead of the head.
    #[must_use]
    pub fn pending_bytes(&self) -> u64 {
        self.unsent().iter().map(Span::remaining).sum()
    }

    /// Drains the consumed prefix out of the chain, handing the spans back
    /// to the producer for destruction or reuse. The head resets to the
    /// first unsent span.
    pub fn reclaim(&mut self) -> Vec<Span> {
        let consumed = self.spans.drain(..self.head).collect();
        self.head = 0;
        consumed
    }
}

impl FromIterator<Span> for Chain {
    fn from_iter<I: IntoIterator<Item = Span>>(iter: I) -> Self {
        Self {
            spans: iter.into_iter().collect(),
            head: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::MemorySpan;
    use std::sync::Arc;

    fn mem(bytes: &[u8]) -> Span {
        Span::Memory(MemorySpan::new(Arc::from(bytes)))
    }

    #[test]
    fn head_truncates_from_the_front_only() {
        let mut chain: Chain = [mem(b"ab"), Span::Flush, mem(b"cd")].into_iter().collect();
        assert_eq!(chain.unsent().len(), 3);
        assert_eq!(chain.pending_bytes(), 4);

        chain.advance_head(2);
        assert_eq!(chain.unsent().len(), 1);
        assert!(!chain.is_empty());

        chain.advance_head(1);
        assert!(chain.is_empty());
        assert_eq!(chain.pending_bytes(), 0);
    }

    #[test]
    fn reclaim_returns_consumed_prefix_in_order() {
        let mut chain: Chain = [mem(b"ab"), mem(b"cd"), mem(b"ef")].into_iter().collect();
        chain.advance_head(2);

        let consumed = chain.reclaim();
        assert_eq!(consumed.len(), 2);
        assert_eq!(chain.unsent().len(), 1);
        assert!(matches!(&chain.unsent()[0], Span::Memory(m) if m.as_slice() == b"ef"));
    }

    #[test]
    #[should_panic(expected = "head advanced past chain end")]
    fn head_cannot_pass_the_end() {
        let mut chain: Chain = [mem(b"ab")].into_iter().collect();
        chain.advance_head(2);
    }
}
