// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Character cursor over raw source text.
//!
//! The [`Scanner`] is the lowest layer of the pipeline: it hands out
//! characters one at a time, tracks byte/line/column position, and supports
//! bounded backtracking through a mark stack. End of input yields `None`
//! rather than an error, so callers never need a failure path.

/// A character cursor with position tracking and mark/reset backtracking.
///
/// # Examples
///
/// ```
/// use weft_core::source_analysis::Scanner;
///
/// let mut scanner = Scanner::new("ab");
/// assert_eq!(scanner.peek(0), Some('a'));
/// assert_eq!(scanner.peek(1), Some('b'));
/// assert_eq!(scanner.advance(), Some('a'));
/// assert_eq!(scanner.advance(), Some('b'));
/// assert!(scanner.at_end());
/// assert_eq!(scanner.advance(), None);
/// ```
#[derive(Debug, Clone)]
pub struct Scanner<'src> {
    source: &'src str,
    /// Current byte position.
    position: usize,
    /// 1-based line of the current position.
    line: u32,
    /// 1-based column of the current position, counted in characters.
    column: u32,
    /// Saved (position, line, column) states for backtracking.
    marks: Vec<(usize, u32, u32)>,
}

impl<'src> Scanner<'src> {
    /// Creates a new scanner over the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
            column: 1,
            marks: Vec::new(),
        }
    }

    /// Peeks `offset` characters ahead without consuming.
    ///
    /// `peek(0)` is the next character to be consumed.
    #[must_use]
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.source[self.position..].chars().nth(offset)
    }

    /// Consumes and returns the next character.
    ///
    /// Advances the column per character; a newline resets the column and
    /// increments the line.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.source[self.position..].chars().next()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consumes characters while the predicate holds.
    pub fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek(0).is_some_and(&predicate) {
            self.advance();
        }
    }

    /// Returns true if the cursor is at end of input.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    /// Returns the current byte position.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    pub fn position(&self) -> u32 {
        self.position as u32
    }

    /// Returns the 1-based line of the current position.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns the 1-based column of the current position.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Returns true if the upcoming input starts with `prefix`.
    #[must_use]
    pub fn matches(&self, prefix: &str) -> bool {
        self.source[self.position..].starts_with(prefix)
    }

    /// Returns the source text between two byte positions.
    #[must_use]
    pub fn text(&self, start: u32, end: u32) -> &'src str {
        &self.source[start as usize..end as usize]
    }

    /// Saves the current cursor state for later backtracking.
    pub fn mark(&mut self) {
        self.marks.push((self.position, self.line, self.column));
    }

    /// Restores the cursor to the most recent mark and removes it.
    ///
    /// A no-op when no mark is outstanding.
    pub fn reset_to_mark(&mut self) {
        if let Some((position, line, column)) = self.marks.pop() {
            self.position = position;
            self.line = line;
            self.column = column;
        }
    }

    /// Discards the most recent mark, keeping the current position.
    pub fn pop_mark(&mut self) {
        self.marks.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_consume() {
        let scanner = Scanner::new("xyz");
        assert_eq!(scanner.peek(0), Some('x'));
        assert_eq!(scanner.peek(2), Some('z'));
        assert_eq!(scanner.peek(3), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn advance_tracks_line_and_column() {
        let mut scanner = Scanner::new("ab\ncd");
        assert_eq!((scanner.line(), scanner.column()), (1, 1));
        scanner.advance();
        scanner.advance();
        assert_eq!((scanner.line(), scanner.column()), (1, 3));
        scanner.advance(); // newline
        assert_eq!((scanner.line(), scanner.column()), (2, 1));
        scanner.advance();
        assert_eq!((scanner.line(), scanner.column()), (2, 2));
    }

    #[test]
    fn end_of_input_is_a_sentinel() {
        let mut scanner = Scanner::new("");
        assert!(scanner.at_end());
        assert_eq!(scanner.advance(), None);
        assert_eq!(scanner.peek(0), None);
    }

    #[test]
    fn mark_and_reset_backtracks() {
        let mut scanner = Scanner::new("abc");
        scanner.advance();
        scanner.mark();
        scanner.advance();
        scanner.advance();
        assert!(scanner.at_end());
        scanner.reset_to_mark();
        assert_eq!(scanner.peek(0), Some('b'));
        assert_eq!(scanner.position(), 1);
    }

    #[test]
    fn pop_mark_keeps_position() {
        let mut scanner = Scanner::new("abc");
        scanner.mark();
        scanner.advance();
        scanner.pop_mark();
        assert_eq!(scanner.peek(0), Some('b'));
        // Reset with no outstanding mark is a no-op
        scanner.reset_to_mark();
        assert_eq!(scanner.peek(0), Some('b'));
    }

    #[test]
    fn advance_while_consumes_matching_run() {
        let mut scanner = Scanner::new("   abc");
        scanner.advance_while(|c| c == ' ');
        assert_eq!(scanner.peek(0), Some('a'));
        assert_eq!(scanner.position(), 3);
    }

    #[test]
    fn multibyte_positions_are_byte_offsets() {
        let mut scanner = Scanner::new("é!");
        scanner.advance();
        assert_eq!(scanner.position(), 2);
        assert_eq!(scanner.column(), 2);
    }
}
