// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! A cursor over lexed tokens.
//!
//! The parser consumes tokens through a [`TokenStream`] rather than the raw
//! vector: the stream saturates at [`TokenKind::Eof`] so lookahead never
//! needs an `Option`, and it can skip layout tokens on request.

use super::{Span, Token, TokenKind};

/// A stream of tokens with arbitrary lookahead.
///
/// Peeking past the end returns the final `Eof` token, which the lexer
/// guarantees is present.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    /// Creates a stream over lexed tokens.
    ///
    /// The token vector must end with `Eof`; [`crate::source_analysis::lex`]
    /// always produces one.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(
            tokens.last().is_some_and(|t| t.kind().is_eof()),
            "token stream must end with Eof"
        );
        Self { tokens, cursor: 0 }
    }

    /// Peeks `offset` tokens ahead. `peek(0)` is the current token.
    #[must_use]
    pub fn peek(&self, offset: usize) -> &Token {
        let idx = (self.cursor + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Returns the current token's kind.
    #[must_use]
    pub fn current(&self) -> &TokenKind {
        self.peek(0).kind()
    }

    /// Returns the current token's span.
    #[must_use]
    pub fn current_span(&self) -> Span {
        self.peek(0).span()
    }

    /// Consumes and returns the current token. Saturates at `Eof`.
    pub fn next(&mut self) -> Token {
        let token = self.tokens[self.cursor.min(self.tokens.len() - 1)].clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        token
    }

    /// Returns true if the current token is `Eof`.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.current().is_eof()
    }

    /// Consumes the current token if it has the same discriminant as `kind`.
    ///
    /// Payload-carrying kinds match on variant alone, so
    /// `eat(&TokenKind::Identifier("".into()))` accepts any identifier.
    pub fn eat(&mut self, kind: &TokenKind) -> Option<Token> {
        if std::mem::discriminant(self.current()) == std::mem::discriminant(kind) {
            Some(self.next())
        } else {
            None
        }
    }

    /// Consumes any run of `Newline`, `Indent`, and `Dedent` tokens.
    ///
    /// Statement boundaries inside brace blocks are layout-insignificant;
    /// the parser calls this where the grammar says so.
    pub fn skip_layout(&mut self) {
        while matches!(
            self.current(),
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
        ) {
            self.next();
        }
    }

    /// Returns the span of the most recently consumed token, or an empty
    /// span at the start of input.
    #[must_use]
    pub fn previous_span(&self) -> Span {
        if self.cursor == 0 {
            Span::new(0, 0)
        } else {
            self.tokens[self.cursor - 1].span()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecow::EcoString;

    fn stream(kinds: Vec<TokenKind>) -> TokenStream {
        let tokens = kinds
            .into_iter()
            .enumerate()
            .map(|(i, k)| {
                let at = u32::try_from(i).unwrap();
                Token::new(k, Span::new(at, at + 1))
            })
            .collect();
        TokenStream::new(tokens)
    }

    #[test]
    fn peek_saturates_at_eof() {
        let s = stream(vec![TokenKind::Newline, TokenKind::Eof]);
        assert_eq!(*s.peek(0).kind(), TokenKind::Newline);
        assert_eq!(*s.peek(5).kind(), TokenKind::Eof);
    }

    #[test]
    fn next_saturates_at_eof() {
        let mut s = stream(vec![TokenKind::Newline, TokenKind::Eof]);
        assert_eq!(*s.next().kind(), TokenKind::Newline);
        assert_eq!(*s.next().kind(), TokenKind::Eof);
        assert_eq!(*s.next().kind(), TokenKind::Eof);
        assert!(s.at_end());
    }

    #[test]
    fn eat_matches_on_discriminant() {
        let mut s = stream(vec![
            TokenKind::Identifier(EcoString::from("Start")),
            TokenKind::Eof,
        ]);
        let token = s.eat(&TokenKind::Identifier(EcoString::new())).unwrap();
        assert_eq!(*token.kind(), TokenKind::Identifier("Start".into()));
        assert!(s.eat(&TokenKind::Newline).is_none());
    }

    #[test]
    fn skip_layout_consumes_runs() {
        let mut s = stream(vec![
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Dedent,
            TokenKind::Colon,
            TokenKind::Eof,
        ]);
        s.skip_layout();
        assert_eq!(*s.current(), TokenKind::Colon);
    }

    #[test]
    fn previous_span_tracks_consumption() {
        let mut s = stream(vec![TokenKind::Newline, TokenKind::Eof]);
        assert_eq!(s.previous_span(), Span::new(0, 0));
        s.next();
        assert_eq!(s.previous_span(), Span::new(0, 1));
    }
}
