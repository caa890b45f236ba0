// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Lexical analysis for Weft source code.
//!
//! The lexer is hand-written and line-oriented: each logical line is
//! measured for indentation, dispatched on its leading structural marker,
//! and then tokenized in the mode that marker implies (narrative text,
//! expression, or choice clause). It owns all the stateful context the
//! grammar needs:
//!
//! - an **indentation stack** (initially `[0]`) producing synthetic
//!   [`TokenKind::Indent`]/[`TokenKind::Dedent`] tokens;
//! - a **line-start flag**, implicit in the line dispatch, which makes
//!   `+`/`*` choice markers at line start and arithmetic operators
//!   elsewhere;
//! - a **brace context** counter for block conditionals spanning lines,
//!   which turns a line-leading `-` into a branch marker;
//! - the `{` **opener lookahead**: a brace opens an expression only when
//!   the first non-blank character after it is `$`, `!`, `(`, `/`, `"`,
//!   or the start of `true`/`false`. Anything else leaves the brace as
//!   literal text (write `\{` for an unambiguous literal brace).
//!
//! # Error Recovery
//!
//! The lexer never fails. Invalid characters become [`TokenKind::Error`]
//! tokens with an attached diagnostic and the cursor advances one
//! character, guaranteeing forward progress. Unterminated strings recover
//! at end of line. A hard cap on accumulated errors aborts pathological
//! inputs with a final summarizing diagnostic.

use ecow::EcoString;

use crate::diagnostics::{codes, Diagnostic};

use super::{Scanner, Span, Token, TokenKind};

/// Hard cap on accumulated lexer + parser errors.
///
/// Shared between phases: the parser starts its budget from the lexer's
/// error count. Reaching the cap aborts the run with a summarizing
/// diagnostic rather than grinding through pathological input.
pub const MAX_ERRORS: usize = 100;

/// How a segment run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentEnd {
    /// The line ended (newline or end of file), terminator not consumed.
    Line,
    /// The context's closing delimiter was consumed.
    Closed,
}

/// Narrative-segment context: what terminates the run besides a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentContext {
    /// A plain text line; only the newline ends it.
    Line,
    /// Choice text inside `[` ... `]`.
    ChoiceText,
    /// Inline-conditional segments inside `{ expr : ... | ... }`.
    Brace,
}

/// A lexer that tokenizes Weft source code.
pub struct Lexer<'src> {
    scanner: Scanner<'src>,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    /// Indentation stack; invariant: never empty, starts `[0]`.
    indents: Vec<u32>,
    /// Open block conditionals.
    brace_depth: u32,
    /// Error-severity diagnostics emitted so far.
    error_count: usize,
    /// Set when the error cap is hit; lexing stops early.
    aborted: bool,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("position", &self.scanner.position())
            .field("indents", &self.indents)
            .field("brace_depth", &self.brace_depth)
            .finish()
    }
}

/// Tokenizes source text, returning the token stream and any diagnostics.
///
/// The returned tokens always end with [`TokenKind::Eof`].
///
/// # Examples
///
/// ```
/// use weft_core::source_analysis::{lex, TokenKind};
///
/// let (tokens, diagnostics) = lex(":: Start\nHello\n");
/// assert!(diagnostics.is_empty());
/// assert!(matches!(tokens[0].kind(), TokenKind::PassageMarker));
/// ```
#[must_use]
pub fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(source).tokenize()
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            scanner: Scanner::new(source),
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            indents: vec![0],
            brace_depth: 0,
            error_count: 0,
            aborted: false,
        }
    }

    /// Runs the lexer to completion.
    #[must_use]
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while !self.scanner.at_end() && !self.aborted {
            self.lex_line();
        }
        let end = self.scanner.position();
        if !self.aborted {
            while self.indents.len() > 1 {
                self.indents.pop();
                self.push(TokenKind::Dedent, Span::new(end, end));
            }
        }
        self.push(TokenKind::Eof, Span::new(end, end));
        (self.tokens, self.diagnostics)
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span));
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.scanner.position())
    }

    /// Records a diagnostic, enforcing the error cap.
    fn report(&mut self, diagnostic: Diagnostic) {
        if self.aborted {
            return;
        }
        let is_error = diagnostic.is_error();
        self.diagnostics.push(diagnostic);
        if is_error {
            self.error_count += 1;
            if self.error_count >= MAX_ERRORS {
                let at = self.scanner.position();
                self.diagnostics.push(Diagnostic::error(
                    codes::TOO_MANY_ERRORS,
                    format!("too many errors ({MAX_ERRORS}); giving up on this script"),
                    Span::new(at, at),
                ));
                self.aborted = true;
            }
        }
    }

    /// Consumes `n` characters and pushes a fixed-width token.
    fn push_marker(&mut self, kind: TokenKind, n: usize) {
        let start = self.scanner.position();
        for _ in 0..n {
            self.scanner.advance();
        }
        let span = self.span_from(start);
        self.push(kind, span);
    }

    fn skip_blanks(&mut self) {
        self.scanner.advance_while(|c| c == ' ' || c == '\t');
    }

    fn at_line_end(&self) -> bool {
        match self.scanner.peek(0) {
            None | Some('\n') => true,
            Some('\r') => self.scanner.peek(1) == Some('\n'),
            _ => false,
        }
    }

    /// Consumes the line terminator, emitting a `Newline` token.
    fn finish_line(&mut self) {
        // Anything left before the terminator is unreachable by
        // construction; drain it defensively so progress is guaranteed.
        while !self.at_line_end() && !self.scanner.at_end() {
            self.scanner.advance();
        }
        if self.scanner.at_end() {
            return;
        }
        let start = self.scanner.position();
        if self.scanner.peek(0) == Some('\r') {
            self.scanner.advance();
        }
        self.scanner.advance(); // '\n'
        let span = self.span_from(start);
        self.push(TokenKind::Newline, span);
    }

    // ========================================================================
    // Line structure
    // ========================================================================

    fn lex_line(&mut self) {
        let indent_start = self.scanner.position();
        let width = self.measure_indentation();

        if self.at_line_end() {
            // Blank lines emit a bare Newline and leave indentation alone.
            self.finish_line();
            return;
        }

        self.handle_indentation(width, self.span_from(indent_start));
        if self.aborted {
            return;
        }

        // Structural dispatch on the first non-whitespace characters.
        if self.scanner.matches("::") {
            self.push_marker(TokenKind::PassageMarker, 2);
            self.lex_expression_rest();
        } else if self.scanner.matches("@@") {
            self.push_marker(TokenKind::MetadataMarker, 2);
            self.lex_metadata_rest();
        } else if self.scanner.matches(">>") {
            self.push_marker(TokenKind::IncludeMarker, 2);
            self.lex_expression_rest();
        } else if self.scanner.matches("->->") {
            // Greedy longest match: four characters before two.
            self.push_marker(TokenKind::TunnelArrow, 4);
            self.lex_expression_rest();
        } else if self.scanner.matches("->") {
            self.push_marker(TokenKind::DivertArrow, 2);
            self.lex_expression_rest();
        } else if self.scanner.matches("<-") {
            self.push_marker(TokenKind::ThreadArrow, 2);
            self.lex_expression_rest();
        } else if self.scanner.matches("~") {
            self.push_marker(TokenKind::AssignMarker, 1);
            self.lex_expression_rest();
        } else if self.scanner.matches("+") {
            self.push_marker(TokenKind::ChoiceSticky, 1);
            self.lex_choice_rest();
        } else if self.scanner.matches("*") {
            self.push_marker(TokenKind::ChoiceOnce, 1);
            self.lex_choice_rest();
        } else if self.brace_depth > 0 && self.scanner.matches("-") {
            self.push_marker(TokenKind::BranchMarker, 1);
            self.lex_expression_rest();
        } else if self.brace_depth > 0 && self.scanner.matches("}") {
            self.push_marker(TokenKind::RightBrace, 1);
            self.brace_depth -= 1;
            self.lex_segments(SegmentContext::Line);
        } else {
            self.lex_segments(SegmentContext::Line);
        }

        self.finish_line();
    }

    /// Measures leading whitespace. A tab advances to the next multiple
    /// of four columns.
    fn measure_indentation(&mut self) -> u32 {
        let mut width = 0u32;
        loop {
            match self.scanner.peek(0) {
                Some(' ') => width += 1,
                Some('\t') => width = width + 4 - width % 4,
                _ => break,
            }
            self.scanner.advance();
        }
        width
    }

    /// Compares line indentation to the stack, emitting Indent/Dedent.
    fn handle_indentation(&mut self, width: u32, span: Span) {
        let top = *self.indents.last().unwrap_or(&0);
        if width > top {
            self.indents.push(width);
            self.push(TokenKind::Indent, span);
            return;
        }
        while width < *self.indents.last().unwrap_or(&0) {
            self.indents.pop();
            self.push(TokenKind::Dedent, span);
        }
        let top = *self.indents.last().unwrap_or(&0);
        if width != top {
            // Dedent landed between stack levels; align without a token.
            self.report(Diagnostic::warning(
                codes::INCONSISTENT_INDENTATION,
                format!("indentation of {width} does not match any enclosing level"),
                span,
            ));
            self.indents.push(width);
        }
    }

    // ========================================================================
    // Narrative text
    // ========================================================================

    /// Lexes narrative segments: literal text split on inline `{...}`
    /// expressions, ending per the context.
    fn lex_segments(&mut self, context: SegmentContext) -> SegmentEnd {
        let mut buf = String::new();
        let mut start = self.scanner.position();

        macro_rules! flush {
            () => {
                if !buf.is_empty() {
                    let span = self.span_from(start);
                    self.push(TokenKind::Text(EcoString::from(buf.as_str())), span);
                    buf.clear();
                }
            };
        }

        loop {
            if self.aborted {
                return SegmentEnd::Line;
            }
            if self.at_line_end() {
                if context == SegmentContext::Line {
                    // Trailing blanks on a text line are not content.
                    while buf.ends_with(' ') || buf.ends_with('\t') {
                        buf.pop();
                    }
                }
                flush!();
                return SegmentEnd::Line;
            }
            let Some(c) = self.scanner.peek(0) else {
                flush!();
                return SegmentEnd::Line;
            };
            match c {
                '\\' => {
                    // `\{`, `\}`, `\\` produce the literal character; any
                    // other escape keeps the backslash verbatim.
                    self.scanner.advance();
                    match self.scanner.peek(0) {
                        Some(e @ ('{' | '}' | '\\')) => {
                            buf.push(e);
                            self.scanner.advance();
                        }
                        _ => buf.push('\\'),
                    }
                }
                '{' if self.is_expression_opener() => {
                    flush!();
                    if self.lex_brace() == SegmentEnd::Line {
                        return SegmentEnd::Line;
                    }
                    start = self.scanner.position();
                }
                ']' if context == SegmentContext::ChoiceText => {
                    flush!();
                    self.push_marker(TokenKind::RightBracket, 1);
                    return SegmentEnd::Closed;
                }
                '|' if context == SegmentContext::Brace => {
                    flush!();
                    self.push_marker(TokenKind::Pipe, 1);
                    start = self.scanner.position();
                }
                '}' if context == SegmentContext::Brace => {
                    flush!();
                    self.push_marker(TokenKind::RightBrace, 1);
                    return SegmentEnd::Closed;
                }
                _ => {
                    buf.push(c);
                    self.scanner.advance();
                }
            }
        }
    }

    /// The mandatory `{` disambiguation lookahead (see module docs).
    ///
    /// Called with the cursor on a `{`. Skips blanks after the brace and
    /// inspects the first meaningful character. This rule is part of the
    /// language surface, not an implementation preference.
    fn is_expression_opener(&self) -> bool {
        let mut n = 1;
        while matches!(self.scanner.peek(n), Some(' ' | '\t')) {
            n += 1;
        }
        match self.scanner.peek(n) {
            Some('$' | '!' | '(' | '/' | '"') => true,
            Some('t' | 'f') => {
                for word in ["true", "false"] {
                    let mut all = true;
                    for (i, w) in word.chars().enumerate() {
                        if self.scanner.peek(n + i) != Some(w) {
                            all = false;
                            break;
                        }
                    }
                    if all {
                        let after = self.scanner.peek(n + word.len());
                        if !after.is_some_and(|c| c.is_alphanumeric() || c == '_') {
                            return true;
                        }
                    }
                }
                false
            }
            _ => false,
        }
    }

    /// Lexes an opened brace: the expression, then either `}` (inline
    /// expression), or `:` plus segments (inline conditional when it
    /// closes on this line, block conditional when it does not).
    fn lex_brace(&mut self) -> SegmentEnd {
        self.push_marker(TokenKind::LeftBrace, 1);
        let mut depth = 0u32;
        loop {
            if self.aborted {
                return SegmentEnd::Line;
            }
            self.skip_blanks();
            if self.at_line_end() {
                let at = self.scanner.position();
                self.report(Diagnostic::error(
                    codes::UNTERMINATED_INLINE,
                    "this `{` expression is missing its closing `}`",
                    Span::new(at, at),
                ));
                return SegmentEnd::Line;
            }
            match self.scanner.peek(0) {
                Some('}') if depth == 0 => {
                    self.push_marker(TokenKind::RightBrace, 1);
                    return SegmentEnd::Closed;
                }
                Some(':') if depth == 0 => {
                    self.push_marker(TokenKind::Colon, 1);
                    // Conventional single space after the colon is layout,
                    // not content.
                    if self.scanner.peek(0) == Some(' ') {
                        self.scanner.advance();
                    }
                    return match self.lex_segments(SegmentContext::Brace) {
                        SegmentEnd::Closed => SegmentEnd::Closed,
                        SegmentEnd::Line => {
                            // Still open at end of line: this brace is a
                            // block conditional spanning further lines.
                            self.brace_depth += 1;
                            SegmentEnd::Line
                        }
                    };
                }
                Some('(') => {
                    depth += 1;
                    self.push_marker(TokenKind::LeftParen, 1);
                }
                Some(')') => {
                    depth = depth.saturating_sub(1);
                    self.push_marker(TokenKind::RightParen, 1);
                }
                Some('[') => {
                    depth += 1;
                    self.push_marker(TokenKind::LeftBracket, 1);
                }
                Some(']') => {
                    depth = depth.saturating_sub(1);
                    self.push_marker(TokenKind::RightBracket, 1);
                }
                _ => self.lex_expression_token(),
            }
        }
    }

    // ========================================================================
    // Expression context
    // ========================================================================

    /// Lexes expression tokens to the end of the line. A top-level `:`
    /// switches to narrative segments (conditional branch lines).
    fn lex_expression_rest(&mut self) {
        loop {
            if self.aborted {
                return;
            }
            self.skip_blanks();
            if self.at_line_end() {
                return;
            }
            match self.scanner.peek(0) {
                Some(':') => {
                    self.push_marker(TokenKind::Colon, 1);
                    if self.scanner.peek(0) == Some(' ') {
                        self.scanner.advance();
                    }
                    self.lex_segments(SegmentContext::Line);
                    return;
                }
                Some('{') if self.is_expression_opener() => {
                    if self.lex_brace() == SegmentEnd::Line {
                        return;
                    }
                }
                _ => self.lex_expression_token(),
            }
        }
    }

    /// Lexes the tail of a choice line: optional `{condition}`, the
    /// `[text]` clause, and an optional `-> target`.
    fn lex_choice_rest(&mut self) {
        loop {
            if self.aborted {
                return;
            }
            self.skip_blanks();
            if self.at_line_end() {
                return;
            }
            if self.scanner.matches("->->") {
                self.push_marker(TokenKind::TunnelArrow, 4);
            } else if self.scanner.matches("->") {
                self.push_marker(TokenKind::DivertArrow, 2);
            } else {
                match self.scanner.peek(0) {
                    Some('{') if self.is_expression_opener() => {
                        if self.lex_brace() == SegmentEnd::Line {
                            return;
                        }
                    }
                    Some('[') => {
                        self.push_marker(TokenKind::LeftBracket, 1);
                        if self.lex_segments(SegmentContext::ChoiceText) == SegmentEnd::Line {
                            return;
                        }
                    }
                    _ => self.lex_expression_token(),
                }
            }
        }
    }

    /// Lexes `@@ key: value`: an identifier, a colon, then raw text to
    /// the end of the line. Directive values have no escapes or
    /// interpolation.
    fn lex_metadata_rest(&mut self) {
        self.skip_blanks();
        if self
            .scanner
            .peek(0)
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            self.lex_identifier_or_keyword();
        }
        self.skip_blanks();
        if self.scanner.peek(0) == Some(':') {
            self.push_marker(TokenKind::Colon, 1);
            if self.scanner.peek(0) == Some(' ') {
                self.scanner.advance();
            }
        }
        let start = self.scanner.position();
        let mut value = String::new();
        while !self.at_line_end() {
            if let Some(c) = self.scanner.advance() {
                value.push(c);
            }
        }
        while value.ends_with(' ') || value.ends_with('\t') {
            value.pop();
        }
        if !value.is_empty() {
            let span = self.span_from(start);
            self.push(TokenKind::Text(EcoString::from(value.as_str())), span);
        }
    }

    /// Lexes one expression token, guaranteeing forward progress.
    fn lex_expression_token(&mut self) {
        let start = self.scanner.position();
        let Some(c) = self.scanner.peek(0) else {
            return;
        };
        match c {
            'a'..='z' | 'A'..='Z' | '_' => self.lex_identifier_or_keyword(),
            '0'..='9' => self.lex_number(),
            '"' => self.lex_string(),
            '$' => {
                self.scanner.advance();
                if self
                    .scanner
                    .peek(0)
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                {
                    let name_start = self.scanner.position();
                    self.scanner
                        .advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
                    let name = self.scanner.text(name_start, self.scanner.position());
                    let span = self.span_from(start);
                    self.push(TokenKind::Variable(EcoString::from(name)), span);
                } else {
                    let span = self.span_from(start);
                    self.report(Diagnostic::error(
                        codes::MISSING_VARIABLE_NAME,
                        "`$` must be followed by a variable name",
                        span,
                    ));
                    self.push(TokenKind::Error(EcoString::from("$")), span);
                }
            }
            '+' => self.lex_op_maybe_eq(TokenKind::Plus, TokenKind::PlusAssign),
            '-' => self.lex_op_maybe_eq(TokenKind::Minus, TokenKind::MinusAssign),
            '*' => self.lex_op_maybe_eq(TokenKind::Star, TokenKind::StarAssign),
            '/' => self.lex_op_maybe_eq(TokenKind::Slash, TokenKind::SlashAssign),
            '=' => self.lex_op_maybe_eq(TokenKind::Assign, TokenKind::EqEq),
            '<' => self.lex_op_maybe_eq(TokenKind::Less, TokenKind::LessEq),
            '>' => self.lex_op_maybe_eq(TokenKind::Greater, TokenKind::GreaterEq),
            '%' => self.push_marker(TokenKind::Percent, 1),
            '(' => self.push_marker(TokenKind::LeftParen, 1),
            ')' => self.push_marker(TokenKind::RightParen, 1),
            '[' => self.push_marker(TokenKind::LeftBracket, 1),
            ']' => self.push_marker(TokenKind::RightBracket, 1),
            ',' => self.push_marker(TokenKind::Comma, 1),
            '|' => self.push_marker(TokenKind::Pipe, 1),
            '!' => {
                if self.scanner.peek(1) == Some('=') {
                    self.push_marker(TokenKind::NotEq, 2);
                } else {
                    self.unexpected_character(c);
                }
            }
            _ => self.unexpected_character(c),
        }
    }

    /// Lexes a one-character operator, or its `=`-suffixed form.
    fn lex_op_maybe_eq(&mut self, bare: TokenKind, with_eq: TokenKind) {
        if self.scanner.peek(1) == Some('=') {
            self.push_marker(with_eq, 2);
        } else {
            self.push_marker(bare, 1);
        }
    }

    fn unexpected_character(&mut self, c: char) {
        let start = self.scanner.position();
        self.scanner.advance();
        let span = self.span_from(start);
        self.report(Diagnostic::error(
            codes::UNEXPECTED_CHARACTER,
            format!("unexpected character `{c}`"),
            span,
        ));
        self.push(TokenKind::Error(EcoString::from(c.to_string())), span);
    }

    fn lex_identifier_or_keyword(&mut self) {
        let start = self.scanner.position();
        self.scanner
            .advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        // Dotted names reference passages brought in by aliased includes,
        // e.g. `-> castle.Entrance`.
        while self.scanner.peek(0) == Some('.')
            && self
                .scanner
                .peek(1)
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            self.scanner.advance();
            self.scanner
                .advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        }
        let text = self.scanner.text(start, self.scanner.position());
        let kind = match text {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "else" => TokenKind::Else,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Identifier(EcoString::from(text)),
        };
        let span = self.span_from(start);
        self.push(kind, span);
    }

    fn lex_number(&mut self) {
        let start = self.scanner.position();
        self.scanner.advance_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.scanner.peek(0) == Some('.')
            && self.scanner.peek(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.scanner.advance();
            self.scanner.advance_while(|c| c.is_ascii_digit());
        }
        let text = EcoString::from(self.scanner.text(start, self.scanner.position()));
        let span = self.span_from(start);
        let kind = if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Integer(text)
        };
        self.push(kind, span);
    }

    /// Lexes a double-quoted string. Escapes: `\"`, `\\`, `\n`, `\t`.
    /// Unterminated strings recover at end of line with an error token.
    fn lex_string(&mut self) {
        let start = self.scanner.position();
        self.scanner.advance(); // opening quote
        let mut value = String::new();
        loop {
            if self.at_line_end() {
                let span = self.span_from(start);
                self.report(Diagnostic::error(
                    codes::UNTERMINATED_STRING,
                    "unterminated string; expected a closing `\"` before the end of the line",
                    span,
                ));
                self.push(TokenKind::Error(EcoString::from(value.as_str())), span);
                return;
            }
            match self.scanner.advance() {
                None => unreachable!("at_line_end() returns true at end of input"),
                Some('"') => {
                    let span = self.span_from(start);
                    self.push(TokenKind::String(EcoString::from(value.as_str())), span);
                    return;
                }
                Some('\\') => match self.scanner.advance() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => {
                        let escape_start = self.scanner.position() - 2;
                        self.report(Diagnostic::error(
                            codes::INVALID_ESCAPE,
                            format!("unknown escape sequence `\\{other}` in string"),
                            self.span_from(escape_start),
                        ));
                        value.push(other);
                    }
                    None => {}
                },
                Some(c) => value.push(c),
            }
        }
    }
}
