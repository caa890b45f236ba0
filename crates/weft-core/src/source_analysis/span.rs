// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Source location tracking.
//!
//! Every token and AST node carries a [`Span`] indicating its position in
//! the source file. Spans are byte-offset ranges; [`SourceText`] maps them
//! back to 1-based line/column [`Position`]s and extracts line excerpts for
//! diagnostics.

use std::ops::Range;

/// A span of source code, represented as a byte offset range.
///
/// Spans are half-open: `start` is inclusive, `end` is exclusive.
///
/// # Examples
///
/// ```
/// use weft_core::source_analysis::Span;
///
/// let span = Span::new(0, 10);
/// assert_eq!(span.start(), 0);
/// assert_eq!(span.end(), 10);
/// assert_eq!(span.len(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    start: u32,
    end: u32,
}

impl Span {
    /// Creates a new span from start and end byte offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns the start byte offset.
    #[must_use]
    pub const fn start(self) -> u32 {
        self.start
    }

    /// Returns the end byte offset (exclusive).
    #[must_use]
    pub const fn end(self) -> u32 {
        self.end
    }

    /// Returns the length of the span in bytes.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    /// Returns true if the span is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Returns true if `other` is fully contained within `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Creates a span that covers both `self` and `other`.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    /// Converts to a `Range<usize>` for indexing into source text.
    #[must_use]
    pub const fn as_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl From<Range<u32>> for Span {
    fn from(range: Range<u32>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<Range<usize>> for Span {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.as_range()
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start as usize, span.len() as usize).into()
    }
}

/// A 1-based line/column position with its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1. Counted in characters, not bytes.
    pub column: u32,
    /// Byte offset into the source text.
    pub byte_offset: u32,
}

/// Source text with a precomputed line index.
///
/// Converts byte offsets to [`Position`]s and extracts the text of a line
/// for diagnostic excerpts.
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    /// Byte offset of the start of each line. `line_starts[0] == 0`.
    line_starts: Vec<u32>,
}

impl SourceText {
    /// Creates a source text, indexing line starts.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { text, line_starts }
    }

    /// Returns the full source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the position of a byte offset.
    ///
    /// Offsets past the end of the text clamp to the final position.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    pub fn position_at(&self, offset: u32) -> Position {
        let offset = offset.min(self.text.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self.text[line_start as usize..offset as usize]
            .chars()
            .count() as u32;
        Position {
            line: line_idx as u32 + 1,
            column: column + 1,
            byte_offset: offset,
        }
    }

    /// Returns the text of a 1-based line, without its trailing newline.
    #[must_use]
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let idx = line.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map_or(self.text.len(), |&next| next as usize);
        Some(self.text[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Returns the number of lines in the source.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        u32::try_from(self.line_starts.len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_and_accessors() {
        let span = Span::new(5, 15);
        assert_eq!(span.start(), 5);
        assert_eq!(span.end(), 15);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
    }

    #[test]
    fn span_merge_takes_extremes() {
        let a = Span::new(5, 10);
        let b = Span::new(15, 20);
        let merged = a.merge(b);
        assert_eq!(merged.start(), 5);
        assert_eq!(merged.end(), 20);
    }

    #[test]
    fn span_contains() {
        let outer = Span::new(0, 10);
        assert!(outer.contains(Span::new(2, 8)));
        assert!(outer.contains(outer));
        assert!(!outer.contains(Span::new(2, 11)));
    }

    #[test]
    fn position_at_maps_lines_and_columns() {
        let src = SourceText::new(":: Start\nHello\n");
        let p = src.position_at(0);
        assert_eq!((p.line, p.column), (1, 1));

        let p = src.position_at(3);
        assert_eq!((p.line, p.column), (1, 4));

        // First char of the second line
        let p = src.position_at(9);
        assert_eq!((p.line, p.column), (2, 1));
    }

    #[test]
    fn position_at_clamps_past_end() {
        let src = SourceText::new("abc");
        let p = src.position_at(100);
        assert_eq!(p.byte_offset, 3);
        assert_eq!((p.line, p.column), (1, 4));
    }

    #[test]
    fn position_counts_chars_not_bytes() {
        let src = SourceText::new("héllo");
        // 'é' is two bytes; offset 3 is the first 'l'
        let p = src.position_at(3);
        assert_eq!(p.column, 3);
    }

    #[test]
    fn line_text_strips_newline() {
        let src = SourceText::new("one\ntwo\r\nthree");
        assert_eq!(src.line_text(1), Some("one"));
        assert_eq!(src.line_text(2), Some("two"));
        assert_eq!(src.line_text(3), Some("three"));
        assert_eq!(src.line_text(4), None);
        assert_eq!(src.line_count(), 3);
    }
}
