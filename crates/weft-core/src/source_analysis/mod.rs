// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Source analysis: scanning, lexing, and parsing.
//!
//! This module turns raw source text into the AST defined in
//! [`crate::ast`]:
//!
//! 1. [`Scanner`] — a character cursor with position tracking;
//! 2. [`lex`] — the indentation-aware lexer producing [`Token`]s;
//! 3. [`Parser`] — a recursive-descent parser with panic-mode recovery.
//!
//! All phases accumulate [`crate::diagnostics::Diagnostic`]s instead of
//! failing on the first error.

mod lexer;
mod parser;
mod scanner;
mod span;
mod token;
mod token_stream;

#[cfg(test)]
mod lexer_property_tests;

pub use lexer::{lex, Lexer, MAX_ERRORS};
pub use parser::{parse, Parser};
pub use scanner::Scanner;
pub use span::{Position, SourceText, Span};
pub use token::{Token, TokenKind};
pub use token_stream::TokenStream;
