use miette::{SourceOffset, SourceSpan};
use std::cmp::{max, min};
use std::ops::Range;

/// Byte offset into the assembly source.
pub type SourcePosition = u32;

/// A span represents a range of bytes in the assembly source.
///
/// It has the same semantics as Rust's x..y range syntax. Records and instructions keep the span of
/// the text they were built from, so that decode failures far away from the parser can still point
/// at the offending line.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Span {
    pub low: SourcePosition,
    pub high: SourcePosition,
}

impl From<Span> for SourceSpan {
    fn from(val: Span) -> Self {
        SourceSpan::new(
            SourceOffset::from(val.low as usize),
            val.high as usize - val.low as usize,
        )
    }
}

impl Span {
    /// Create a new span from the low and high positions.
    pub fn new(range: Range<SourcePosition>) -> Self {
        Self {
            low: range.start,
            high: range.end,
        }
    }

    /// Create a new span covering a single byte.
    pub fn pos(low: SourcePosition) -> Self {
        Self { low, high: low + 1 }
    }

    pub fn empty() -> Self {
        Self { low: 0, high: 0 }
    }

    /// Get the union of two spans.
    ///
    /// ```
    /// use llir_span::Span;
    ///
    /// let a = Span::new(0..10);
    /// let b = Span::new(5..15);
    /// assert_eq!(a.merge(&b), Span::new(0..15));
    /// ```
    pub fn merge(&self, other: &Self) -> Self {
        let low = min(self.low, other.low);
        let high = max(self.high, other.high);
        Self { low, high }
    }
}

impl From<Range<SourcePosition>> for Span {
    fn from(range: Range<SourcePosition>) -> Self {
        Self::new(range)
    }
}

#[cfg(test)]
mod tests {
    use crate::Span;
    use miette::SourceSpan;

    #[test]
    fn test_span_converts_to_source_span() {
        let span = SourceSpan::from(Span::new(4..9));
        assert_eq!(span.offset(), 4);
        assert_eq!(span.len(), 5);
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = Span::new(3..4);
        let b = Span::pos(10);
        assert_eq!(a.merge(&b), b.merge(&a));
        assert_eq!(a.merge(&b), Span::new(3..11));
    }
}
