// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the lexer.
//!
//! The lexer's contract is total: any input, however hostile, produces a
//! token stream ending in `Eof` with in-bounds spans, and never panics.

use proptest::prelude::*;

use super::{lex, Token, TokenKind};

proptest! {
    #[test]
    fn lexing_never_panics_and_ends_with_eof(source in "\\PC*") {
        let (tokens, _) = lex(&source);
        prop_assert!(matches!(
            tokens.last().map(Token::kind),
            Some(TokenKind::Eof)
        ));
    }

    #[test]
    fn token_spans_lie_within_the_source(source in "\\PC*") {
        let (tokens, _) = lex(&source);
        for token in &tokens {
            let span = token.span();
            prop_assert!(span.start() <= span.end());
            prop_assert!(span.end() as usize <= source.len());
        }
    }

    #[test]
    fn lexing_is_deterministic(source in "\\PC*") {
        let (first, _) = lex(&source);
        let (second, _) = lex(&source);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn diagnostics_imply_error_tokens_or_warnings(source in "\\PC*") {
        // Error recovery is silent in the token stream only when every
        // diagnostic is a warning.
        let (tokens, diagnostics) = lex(&source);
        let has_error_diagnostic = diagnostics.iter().any(|d| d.is_error());
        let has_error_token = tokens.iter().any(|t| t.kind().is_error());
        if has_error_token {
            prop_assert!(has_error_diagnostic);
        }
    }

    /// Indentation that moves one level at a time always balances its
    /// Indent and Dedent tokens.
    #[test]
    fn single_step_indentation_balances(steps in proptest::collection::vec(-1i32..=1, 1..24)) {
        let mut level: i32 = 0;
        let mut source = String::new();
        for step in steps {
            level = (level + step).max(0);
            for _ in 0..level {
                source.push_str("    ");
            }
            source.push_str("line\n");
        }
        let (tokens, diagnostics) = lex(&source);
        prop_assert!(diagnostics.is_empty());
        let indents = tokens.iter().filter(|t| matches!(t.kind(), TokenKind::Indent)).count();
        let dedents = tokens.iter().filter(|t| matches!(t.kind(), TokenKind::Dedent)).count();
        prop_assert_eq!(indents, dedents);
    }

    /// Plain narrative lines (no structural characters) round back out
    /// of the lexer as a single text token per line.
    #[test]
    fn plain_text_lines_survive(lines in proptest::collection::vec("[a-zA-Z][a-zA-Z0-9 ,.!?']{0,30}", 1..8)) {
        let source = lines.join("\n");
        let (tokens, diagnostics) = lex(&source);
        prop_assert!(diagnostics.is_empty());
        let texts: Vec<&str> = tokens
            .iter()
            .filter_map(|t| match t.kind() {
                TokenKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        let expected: Vec<String> = lines
            .iter()
            .map(|l| l.trim_end().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        prop_assert_eq!(texts, expected);
    }
}
