// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Token types for Weft lexical analysis.
//!
//! Weft tokens fall into four groups:
//!
//! - **Layout**: synthetic [`TokenKind::Indent`]/[`TokenKind::Dedent`]
//!   emitted from the indentation stack, plus `Newline` and `Eof`.
//! - **Structural markers**: the fixed sigils that open a line or clause
//!   (`::`, `+`, `*`, `->`, `->->`, `<-`, `~`, `@@`, `>>`, `-`).
//! - **Narrative text**: runs of prose carried verbatim in
//!   [`TokenKind::Text`].
//! - **Expression tokens**: identifiers, `$variables`, literals, operators
//!   and delimiters, produced only inside expression context.
//!
//! Tokens are immutable once produced and cheap to clone ([`EcoString`]
//! payloads).

use ecow::EcoString;

use super::Span;

/// The kind of token, not including source location.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // === Layout ===
    /// End of a logical line.
    Newline,
    /// Indentation increased past the top of the indentation stack.
    Indent,
    /// Indentation dropped to a previous stack level.
    Dedent,
    /// End of file.
    Eof,

    // === Structural markers ===
    /// Passage declaration: `::`
    PassageMarker,
    /// Sticky (repeatable) choice marker: `+` at line start.
    ChoiceSticky,
    /// One-time choice marker: `*` at line start.
    ChoiceOnce,
    /// Divert arrow: `->`
    DivertArrow,
    /// Tunnel arrow: `->->` (call with a target, return without).
    TunnelArrow,
    /// Thread arrow: `<-`
    ThreadArrow,
    /// Assignment marker: `~`
    AssignMarker,
    /// Metadata marker: `@@`
    MetadataMarker,
    /// Include marker: `>>`
    IncludeMarker,
    /// Conditional branch marker: `-` at line start inside `{ ... }`.
    BranchMarker,

    // === Narrative text ===
    /// A run of literal prose.
    Text(EcoString),

    // === Identifiers & literals ===
    /// An identifier: passage name, function name, tag, `include`/`as`.
    Identifier(EcoString),
    /// A variable reference: `$name` (stored without the sigil).
    Variable(EcoString),
    /// An integer literal.
    Integer(EcoString),
    /// A floating-point literal.
    Float(EcoString),
    /// A double-quoted string literal (stored with escapes resolved).
    String(EcoString),
    /// Boolean literal `true`.
    True,
    /// Boolean literal `false`.
    False,

    // === Expression keywords ===
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `else` (conditional branches only).
    Else,

    // === Operators ===
    /// `+` in expression position.
    Plus,
    /// `-` in expression position.
    Minus,
    /// `*` in expression position.
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `=`
    Assign,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `/=`
    SlashAssign,

    // === Delimiters ===
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{` (expression/conditional opener only; literal braces stay text).
    LeftBrace,
    /// `}`
    RightBrace,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `|` (inline-conditional else separator).
    Pipe,

    // === Special ===
    /// Invalid input (preserves the offending text for error recovery).
    Error(EcoString),
}

impl TokenKind {
    /// Returns true if this token is a choice marker.
    #[must_use]
    pub const fn is_choice_marker(&self) -> bool {
        matches!(self, Self::ChoiceSticky | Self::ChoiceOnce)
    }

    /// Returns true if this token is a literal value.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Integer(_) | Self::Float(_) | Self::String(_) | Self::True | Self::False
        )
    }

    /// Returns true if this token is an assignment operator.
    #[must_use]
    pub const fn is_assign_op(&self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::PlusAssign
                | Self::MinusAssign
                | Self::StarAssign
                | Self::SlashAssign
        )
    }

    /// Returns true if this token ends a logical line.
    #[must_use]
    pub const fn is_line_end(&self) -> bool {
        matches!(self, Self::Newline | Self::Eof)
    }

    /// Returns true if this is the end-of-file marker.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Returns true if this is an error token.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the string content if this token carries one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s)
            | Self::Identifier(s)
            | Self::Variable(s)
            | Self::Integer(s)
            | Self::Float(s)
            | Self::String(s)
            | Self::Error(s) => Some(s),
            _ => None,
        }
    }

    /// A short human-readable description for diagnostics.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Newline => "end of line",
            Self::Indent => "indentation",
            Self::Dedent => "end of indented block",
            Self::Eof => "end of file",
            Self::PassageMarker => "`::`",
            Self::ChoiceSticky => "`+`",
            Self::ChoiceOnce => "`*`",
            Self::DivertArrow => "`->`",
            Self::TunnelArrow => "`->->`",
            Self::ThreadArrow => "`<-`",
            Self::AssignMarker => "`~`",
            Self::MetadataMarker => "`@@`",
            Self::IncludeMarker => "`>>`",
            Self::BranchMarker => "`-`",
            Self::Text(_) => "text",
            Self::Identifier(_) => "a name",
            Self::Variable(_) => "a variable",
            Self::Integer(_) | Self::Float(_) => "a number",
            Self::String(_) => "a string",
            Self::True | Self::False => "a boolean",
            Self::And => "`and`",
            Self::Or => "`or`",
            Self::Not => "`not`",
            Self::Else => "`else`",
            Self::Plus => "`+`",
            Self::Minus => "`-`",
            Self::Star => "`*`",
            Self::Slash => "`/`",
            Self::Percent => "`%`",
            Self::EqEq => "`==`",
            Self::NotEq => "`!=`",
            Self::Less => "`<`",
            Self::LessEq => "`<=`",
            Self::Greater => "`>`",
            Self::GreaterEq => "`>=`",
            Self::Assign => "`=`",
            Self::PlusAssign => "`+=`",
            Self::MinusAssign => "`-=`",
            Self::StarAssign => "`*=`",
            Self::SlashAssign => "`/=`",
            Self::LeftParen => "`(`",
            Self::RightParen => "`)`",
            Self::LeftBracket => "`[`",
            Self::RightBracket => "`]`",
            Self::LeftBrace => "`{`",
            Self::RightBrace => "`}`",
            Self::Colon => "`:`",
            Self::Comma => "`,`",
            Self::Pipe => "`|`",
            Self::Error(_) => "invalid input",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) | Self::Identifier(s) | Self::Integer(s) | Self::Float(s) => {
                write!(f, "{s}")
            }
            Self::Variable(s) => write!(f, "${s}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Error(s) => write!(f, "<error: {s}>"),
            Self::Newline => write!(f, "<newline>"),
            Self::Indent => write!(f, "<indent>"),
            Self::Dedent => write!(f, "<dedent>"),
            Self::Eof => write!(f, "<eof>"),
            Self::PassageMarker => write!(f, "::"),
            Self::ChoiceSticky => write!(f, "+"),
            Self::ChoiceOnce => write!(f, "*"),
            Self::DivertArrow => write!(f, "->"),
            Self::TunnelArrow => write!(f, "->->"),
            Self::ThreadArrow => write!(f, "<-"),
            Self::AssignMarker => write!(f, "~"),
            Self::MetadataMarker => write!(f, "@@"),
            Self::IncludeMarker => write!(f, ">>"),
            Self::BranchMarker => write!(f, "-"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::Else => write!(f, "else"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Percent => write!(f, "%"),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Less => write!(f, "<"),
            Self::LessEq => write!(f, "<="),
            Self::Greater => write!(f, ">"),
            Self::GreaterEq => write!(f, ">="),
            Self::Assign => write!(f, "="),
            Self::PlusAssign => write!(f, "+="),
            Self::MinusAssign => write!(f, "-="),
            Self::StarAssign => write!(f, "*="),
            Self::SlashAssign => write!(f, "/="),
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::LeftBracket => write!(f, "["),
            Self::RightBracket => write!(f, "]"),
            Self::LeftBrace => write!(f, "{{"),
            Self::RightBrace => write!(f, "}}"),
            Self::Colon => write!(f, ":"),
            Self::Comma => write!(f, ","),
            Self::Pipe => write!(f, "|"),
        }
    }
}

/// A token with its source location.
///
/// # Examples
///
/// ```
/// use weft_core::source_analysis::{Span, Token, TokenKind};
///
/// let token = Token::new(TokenKind::Identifier("Start".into()), Span::new(3, 8));
/// assert!(matches!(token.kind(), TokenKind::Identifier(_)));
/// assert_eq!(token.span().len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    kind: TokenKind,
    span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns the kind of this token.
    #[must_use]
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Consumes the token and returns its kind.
    #[must_use]
    pub fn into_kind(self) -> TokenKind {
        self.kind
    }

    /// Returns the source span of this token.
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }
}
