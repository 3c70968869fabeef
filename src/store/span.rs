//! Span - offset and length into the character buffer
//!
//! Attribute values, namespace URIs and PI data are stored as spans so that
//! every piece of character data in a document lives in one buffer.

/// A region of the shared character buffer.
///
/// Offsets and lengths are in bytes of UTF-8 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: u32,
    pub len: u32,
}

impl Span {
    #[inline]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Create an empty span (used for "no value")
    #[inline]
    pub const fn empty() -> Self {
        Self { offset: 0, len: 0 }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the end offset (exclusive)
    #[inline]
    pub const fn end(&self) -> u32 {
        self.offset.saturating_add(self.len)
    }

    /// Extend to cover `other` when the two are adjacent
    #[inline]
    pub fn merge_adjacent(&mut self, other: Span) -> bool {
        if self.end() == other.offset {
            self.len += other.len;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_end() {
        let span = Span::new(10, 5);
        assert_eq!(span.end(), 15);
        assert!(!span.is_empty());
        assert!(Span::empty().is_empty());
    }

    #[test]
    fn test_merge_adjacent() {
        let mut span = Span::new(0, 3);
        assert!(span.merge_adjacent(Span::new(3, 4)));
        assert_eq!(span, Span::new(0, 7));
        assert!(!span.merge_adjacent(Span::new(9, 1)));
        assert_eq!(span.len, 7);
    }
}
