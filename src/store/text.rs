//! Shared character buffer
//!
//! Append-only UTF-8 storage for every piece of character data in a document.
//! Nodes keep `(offset, len)` pairs into it; adjacent text runs land next to
//! each other so coalescing is a matter of widening one span.

use super::span::Span;

#[derive(Debug, Default, Clone)]
pub struct TextBuffer {
    data: String,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self {
            data: String::with_capacity(4096),
        }
    }

    /// Current length in bytes (the offset the next append will receive)
    #[inline]
    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append `s` and return the span it occupies
    pub fn append(&mut self, s: &str) -> Span {
        let offset = self.len();
        self.data.push_str(s);
        Span::new(offset, s.len() as u32)
    }

    /// Resolve a span. Out-of-range spans yield the empty string.
    #[inline]
    pub fn slice(&self, span: Span) -> &str {
        self.data
            .get(span.offset as usize..span.end() as usize)
            .unwrap_or("")
    }

    /// Drop everything from `offset` on (used to discard a whitespace-only run)
    pub fn truncate(&mut self, offset: u32) {
        self.data.truncate(offset as usize);
    }

    /// XML whitespace test (space, tab, CR, LF)
    pub fn is_whitespace(&self, span: Span) -> bool {
        self.slice(span)
            .bytes()
            .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_slice() {
        let mut buf = TextBuffer::new();
        let a = buf.append("hello");
        let b = buf.append(" world");
        assert_eq!(buf.slice(a), "hello");
        assert_eq!(buf.slice(b), " world");
        assert_eq!(b.offset, 5);
        assert_eq!(buf.len(), 11);
    }

    #[test]
    fn test_adjacent_runs_coalesce() {
        let mut buf = TextBuffer::new();
        let mut run = buf.append("ab");
        assert!(run.merge_adjacent(buf.append("cd")));
        assert_eq!(buf.slice(run), "abcd");
    }

    #[test]
    fn test_truncate_and_whitespace() {
        let mut buf = TextBuffer::new();
        buf.append("keep");
        let ws = buf.append(" \n\t");
        assert!(buf.is_whitespace(ws));
        buf.truncate(ws.offset);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.slice(ws), "");
    }

    #[test]
    fn test_out_of_range_span() {
        let buf = TextBuffer::new();
        assert_eq!(buf.slice(Span::new(10, 3)), "");
    }
}
