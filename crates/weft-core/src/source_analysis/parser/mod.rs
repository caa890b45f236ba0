// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Recursive-descent parser for Weft scripts.
//!
//! The parser consumes the lexer's token stream and builds the AST in
//! [`crate::ast`]. Statements dispatch on their leading structural token;
//! expressions use Pratt parsing driven by [`binary_binding_power`].
//!
//! # Error Recovery
//!
//! Parsing never fails: malformed regions produce `Error` nodes and the
//! parser synchronizes to the next statement boundary (passage marker,
//! choice marker, assignment marker, or newline) in panic mode, so one
//! mistake reports once rather than cascading. The error budget is shared
//! with the lexer: diagnostics from both phases count toward the same
//! [`MAX_ERRORS`] cap.

use ecow::EcoString;

use crate::ast::{Divert, Identifier, Include, Metadata, Passage, Script, Statement};
use crate::diagnostics::{codes, Diagnostic};

use super::{lex, Token, TokenKind, TokenStream, MAX_ERRORS};

mod expressions;
mod statements;

#[cfg(test)]
mod property_tests;

// ============================================================================
// Pratt Parsing for Binary Operator Precedence
// ============================================================================

/// Binding power for binary operators (Pratt parsing).
///
/// Higher values bind tighter. Left-associative operators have
/// `left == right - 1`, so a recursive call with `right` refuses to
/// consume another operator of the same level.
#[derive(Debug, Clone, Copy)]
pub(super) struct BindingPower {
    pub(super) left: u8,
    pub(super) right: u8,
}

impl BindingPower {
    const fn left_assoc(precedence: u8) -> Self {
        Self {
            left: precedence,
            right: precedence + 1,
        }
    }
}

/// Gets the binding power for a binary operator token.
///
/// Returns `None` for non-operators, which ends binary expression
/// parsing — useful for error recovery at statement boundaries.
///
/// # Precedence Levels (from loosest to tightest)
///
/// | Level | Operators           |
/// |-------|---------------------|
/// | 10    | `or`                |
/// | 20    | `and`               |
/// | 30    | `==` `!=`           |
/// | 40    | `<` `<=` `>` `>=`   |
/// | 50    | `+` `-`             |
/// | 60    | `*` `/` `%`         |
///
/// All binary operators are left-associative. Unary `not` and `-` bind
/// tighter than any binary operator; postfix indexing tighter still.
pub(super) fn binary_binding_power(kind: &TokenKind) -> Option<(crate::ast::BinaryOp, BindingPower)> {
    use crate::ast::BinaryOp;
    let (op, bp) = match kind {
        TokenKind::Or => (BinaryOp::Or, BindingPower::left_assoc(10)),
        TokenKind::And => (BinaryOp::And, BindingPower::left_assoc(20)),
        TokenKind::EqEq => (BinaryOp::Eq, BindingPower::left_assoc(30)),
        TokenKind::NotEq => (BinaryOp::NotEq, BindingPower::left_assoc(30)),
        TokenKind::Less => (BinaryOp::Less, BindingPower::left_assoc(40)),
        TokenKind::LessEq => (BinaryOp::LessEq, BindingPower::left_assoc(40)),
        TokenKind::Greater => (BinaryOp::Greater, BindingPower::left_assoc(40)),
        TokenKind::GreaterEq => (BinaryOp::GreaterEq, BindingPower::left_assoc(40)),
        TokenKind::Plus => (BinaryOp::Add, BindingPower::left_assoc(50)),
        TokenKind::Minus => (BinaryOp::Sub, BindingPower::left_assoc(50)),
        TokenKind::Star => (BinaryOp::Mul, BindingPower::left_assoc(60)),
        TokenKind::Slash => (BinaryOp::Div, BindingPower::left_assoc(60)),
        TokenKind::Percent => (BinaryOp::Mod, BindingPower::left_assoc(60)),
        _ => return None,
    };
    Some((op, bp))
}

/// Parses source text into a [`Script`].
///
/// This is the main syntactic entry point: it lexes and parses in one
/// call, returning the AST together with all diagnostics from both
/// phases. A script is always returned, even with errors; check the
/// diagnostics before trusting the tree.
///
/// # Examples
///
/// ```
/// use weft_core::source_analysis::parse;
///
/// let (script, diagnostics) = parse(":: Start\nHello, traveler.\n");
/// assert!(diagnostics.is_empty());
/// assert_eq!(script.passages.len(), 1);
/// ```
#[must_use]
pub fn parse(source: &str) -> (Script, Vec<Diagnostic>) {
    let (tokens, diagnostics) = lex(source);
    let mut parser = Parser::with_diagnostics(tokens, diagnostics);
    let script = parser.parse_script();
    (script, parser.into_diagnostics())
}

/// What terminates a statement sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockContext {
    /// A passage body; runs to the next passage or directive.
    Passage,
    /// An indented block under a choice; a `Dedent` closes it.
    ChoiceBody,
    /// A block-conditional branch; `-` and `}` close it. Indentation is
    /// insignificant here.
    ConditionalBranch,
}

/// A parser that builds an AST from lexed tokens.
pub struct Parser {
    pub(super) stream: TokenStream,
    pub(super) diagnostics: Vec<Diagnostic>,
    /// Suppresses diagnostics until the next synchronization point.
    panic_mode: bool,
    /// Guards against stack exhaustion on deeply nested expressions.
    pub(super) nesting_depth: usize,
    /// Error-severity diagnostics so far, lexer's included.
    error_count: usize,
    aborted: bool,
}

impl Parser {
    /// Creates a parser over lexed tokens with no prior diagnostics.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_diagnostics(tokens, Vec::new())
    }

    /// Creates a parser that continues the lexer's diagnostic budget.
    #[must_use]
    pub fn with_diagnostics(tokens: Vec<Token>, diagnostics: Vec<Diagnostic>) -> Self {
        let error_count = diagnostics.iter().filter(|d| d.is_error()).count();
        let aborted = diagnostics
            .iter()
            .any(|d| d.code == codes::TOO_MANY_ERRORS);
        Self {
            stream: TokenStream::new(tokens),
            diagnostics,
            panic_mode: false,
            nesting_depth: 0,
            error_count,
            aborted,
        }
    }

    /// Returns all accumulated diagnostics, consuming the parser.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    // ========================================================================
    // Diagnostics and recovery
    // ========================================================================

    /// Reports a diagnostic unless suppressed by panic mode, and enters
    /// panic mode for error-severity reports.
    pub(super) fn error(&mut self, diagnostic: Diagnostic) {
        if self.aborted || (self.panic_mode && diagnostic.is_error()) {
            return;
        }
        let is_error = diagnostic.is_error();
        self.diagnostics.push(diagnostic);
        if is_error {
            self.panic_mode = true;
            self.error_count += 1;
            if self.error_count >= MAX_ERRORS {
                let at = self.stream.current_span();
                self.diagnostics.push(Diagnostic::error(
                    codes::TOO_MANY_ERRORS,
                    format!("too many errors ({MAX_ERRORS}); giving up on this script"),
                    at,
                ));
                self.aborted = true;
            }
        }
    }

    /// Reports without entering panic mode; used where parsing can
    /// continue meaningfully from the very next token.
    pub(super) fn error_no_panic(&mut self, diagnostic: Diagnostic) {
        let was_panicking = self.panic_mode;
        self.error(diagnostic);
        self.panic_mode = was_panicking;
    }

    pub(super) fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Skips tokens until a statement boundary, leaving panic mode.
    ///
    /// Sync points are the tokens that can only begin a fresh statement:
    /// `::`, `+`, `*`, `~`, a newline, or end of file.
    pub(super) fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.aborted {
            match self.stream.current() {
                TokenKind::PassageMarker
                | TokenKind::ChoiceSticky
                | TokenKind::ChoiceOnce
                | TokenKind::AssignMarker
                | TokenKind::Newline
                | TokenKind::Eof => return,
                _ => {
                    self.stream.next();
                }
            }
        }
    }

    /// Consumes a token of the expected kind, or reports and returns
    /// `None`. Matches on discriminant, so payload kinds match any value.
    pub(super) fn expect(
        &mut self,
        kind: &TokenKind,
        code: &'static str,
        context: &str,
    ) -> Option<Token> {
        if let Some(token) = self.stream.eat(kind) {
            return Some(token);
        }
        let found = self.stream.current().describe();
        self.error(Diagnostic::error(
            code,
            format!("expected {} in {context}, found {found}", kind.describe()),
            self.stream.current_span(),
        ));
        None
    }

    /// True if the current token ends the line.
    pub(super) fn at_line_end(&self) -> bool {
        self.stream.current().is_line_end()
    }

    /// Requires the line to be over; anything else reports once and
    /// skips to the end of the line.
    pub(super) fn expect_line_end(&mut self, code: &'static str, context: &str) {
        if self.at_line_end()
            || matches!(
                self.stream.current(),
                TokenKind::Dedent | TokenKind::Indent
            )
        {
            return;
        }
        let found = self.stream.current().describe();
        self.error(Diagnostic::error(
            code,
            format!("expected end of line after {context}, found {found}"),
            self.stream.current_span(),
        ));
        self.synchronize();
    }

    // ========================================================================
    // Script structure
    // ========================================================================

    /// Parses the whole token stream into a script.
    pub fn parse_script(&mut self) -> Script {
        let start = self.stream.current_span();
        let mut script = Script {
            metadata: Vec::new(),
            includes: Vec::new(),
            passages: Vec::new(),
            preamble: Vec::new(),
            span: start,
        };

        while !self.stream.at_end() && !self.aborted {
            match self.stream.current() {
                TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent => {
                    self.stream.next();
                }
                TokenKind::MetadataMarker => {
                    if let Some(metadata) = self.parse_metadata() {
                        script.metadata.push(metadata);
                    }
                }
                TokenKind::IncludeMarker => {
                    if let Some(include) = self.parse_include() {
                        script.includes.push(include);
                    }
                }
                TokenKind::PassageMarker => {
                    if let Some(passage) = self.parse_passage() {
                        script.passages.push(passage);
                    }
                }
                _ => {
                    // Content before the first passage header. Parsed
                    // normally; semantic analysis decides what is legal
                    // outside a passage.
                    let mut statements = Vec::new();
                    self.parse_statement_into(&mut statements);
                    script.preamble.extend(statements);
                }
            }
        }

        script.span = start.merge(self.stream.current_span());
        script
    }

    /// Parses a `@@ key: value` directive.
    fn parse_metadata(&mut self) -> Option<Metadata> {
        let start = self.stream.current_span();
        self.stream.next(); // @@
        let key = self.expect_identifier(codes::MALFORMED_DIRECTIVE, "`@@` directive")?;
        if self
            .expect(&TokenKind::Colon, codes::MALFORMED_DIRECTIVE, "`@@` directive")
            .is_none()
        {
            self.synchronize();
            return None;
        }
        let value = match self.stream.eat(&TokenKind::Text(EcoString::new())) {
            Some(token) => match token.into_kind() {
                TokenKind::Text(text) => EcoString::from(text.trim_end()),
                _ => unreachable!("eat() matched a Text token"),
            },
            None => EcoString::new(),
        };
        let span = start.merge(self.stream.previous_span());
        self.expect_line_end(codes::MALFORMED_DIRECTIVE, "a `@@` directive");
        Some(Metadata { key, value, span })
    }

    /// Parses a `>> include "path" as alias` directive. `import` is an
    /// accepted synonym for `include`.
    fn parse_include(&mut self) -> Option<Include> {
        let start = self.stream.current_span();
        self.stream.next(); // >>
        let keyword = self.expect_identifier(codes::MALFORMED_DIRECTIVE, "`>>` directive")?;
        if keyword.name != "include" && keyword.name != "import" {
            self.error(Diagnostic::error(
                codes::MALFORMED_DIRECTIVE,
                format!(
                    "unknown directive `>> {}`; expected `include` or `import`",
                    keyword.name
                ),
                keyword.span,
            ));
            self.synchronize();
            return None;
        }
        let path_token = self.expect(
            &TokenKind::String(EcoString::new()),
            codes::MALFORMED_DIRECTIVE,
            "`>> include`",
        )?;
        let path_span = path_token.span();
        let path = match path_token.into_kind() {
            TokenKind::String(path) => path,
            _ => unreachable!("expect() matched a String token"),
        };

        let mut alias = None;
        if let Some(word) = self.stream.eat(&TokenKind::Identifier(EcoString::new())) {
            let is_as = matches!(word.kind(), TokenKind::Identifier(name) if name == "as");
            if is_as {
                alias = self.expect_identifier(codes::MALFORMED_DIRECTIVE, "`include ... as`");
            } else {
                self.error(Diagnostic::error(
                    codes::MALFORMED_DIRECTIVE,
                    "expected `as alias` or end of line after the include path",
                    word.span(),
                ));
            }
        }
        let span = start.merge(self.stream.previous_span());
        self.expect_line_end(codes::MALFORMED_DIRECTIVE, "an include directive");
        Some(Include {
            path,
            path_span,
            alias,
            span,
        })
    }

    /// Parses a `:: Name [tags]` header and the passage body under it.
    fn parse_passage(&mut self) -> Option<Passage> {
        let start = self.stream.current_span();
        self.stream.next(); // ::
        let Some(name) = self.expect_identifier(codes::MALFORMED_PASSAGE, "passage header") else {
            self.synchronize();
            return None;
        };

        let mut tags = Vec::new();
        if self.stream.eat(&TokenKind::LeftBracket).is_some() {
            loop {
                match self.stream.current() {
                    TokenKind::RightBracket => {
                        self.stream.next();
                        break;
                    }
                    TokenKind::Identifier(_) => {
                        if let Some(tag) =
                            self.expect_identifier(codes::MALFORMED_PASSAGE, "passage tags")
                        {
                            tags.push(tag);
                        }
                        // Optional separator
                        let _ = self.stream.eat(&TokenKind::Comma);
                    }
                    _ => {
                        self.error(Diagnostic::error(
                            codes::MALFORMED_PASSAGE,
                            format!(
                                "expected a tag name or `]`, found {}",
                                self.stream.current().describe()
                            ),
                            self.stream.current_span(),
                        ));
                        self.synchronize();
                        break;
                    }
                }
            }
        }
        self.expect_line_end(codes::MALFORMED_PASSAGE, "a passage header");

        let body = self.parse_statements(BlockContext::Passage);
        let span = start.merge(self.stream.previous_span());
        Some(Passage {
            name,
            tags,
            body,
            span,
        })
    }

    /// Parses a statement sequence for the given block context.
    pub(super) fn parse_statements(&mut self, context: BlockContext) -> Vec<Statement> {
        let mut statements = Vec::new();
        loop {
            if self.aborted {
                break;
            }
            match self.stream.current() {
                TokenKind::Eof
                | TokenKind::PassageMarker
                | TokenKind::MetadataMarker
                | TokenKind::IncludeMarker => break,
                TokenKind::Dedent if context == BlockContext::ChoiceBody => {
                    self.stream.next();
                    break;
                }
                TokenKind::BranchMarker | TokenKind::RightBrace
                    if context == BlockContext::ConditionalBranch =>
                {
                    break;
                }
                TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent => {
                    self.stream.next();
                }
                _ => self.parse_statement_into(&mut statements),
            }
        }
        statements
    }

    /// Parses the divert target after a `->`, `->->`, or `<-` arrow:
    /// a passage name with optional `(args)`.
    pub(super) fn parse_divert_target(&mut self) -> Option<Divert> {
        let start = self.stream.previous_span();
        let target = self.expect_identifier(codes::MALFORMED_DIVERT, "divert target")?;
        let mut args = Vec::new();
        if self.stream.eat(&TokenKind::LeftParen).is_some() {
            loop {
                match self.stream.current() {
                    TokenKind::RightParen => {
                        self.stream.next();
                        break;
                    }
                    TokenKind::Newline | TokenKind::Eof => {
                        self.error(Diagnostic::error(
                            codes::MALFORMED_DIVERT,
                            "unclosed `(` in divert arguments",
                            self.stream.current_span(),
                        ));
                        break;
                    }
                    _ => {
                        args.push(self.parse_expression());
                        if self.stream.eat(&TokenKind::Comma).is_none()
                            && *self.stream.current() != TokenKind::RightParen
                        {
                            self.error(Diagnostic::error(
                                codes::MALFORMED_DIVERT,
                                format!(
                                    "expected `,` or `)` in divert arguments, found {}",
                                    self.stream.current().describe()
                                ),
                                self.stream.current_span(),
                            ));
                            self.synchronize();
                            break;
                        }
                    }
                }
            }
        }
        let span = start.merge(self.stream.previous_span());
        Some(Divert {
            target,
            args,
            resolved: None,
            span,
        })
    }

    /// Consumes an identifier token into an [`Identifier`] node.
    pub(super) fn expect_identifier(
        &mut self,
        code: &'static str,
        context: &str,
    ) -> Option<Identifier> {
        let token = self.expect(&TokenKind::Identifier(EcoString::new()), code, context)?;
        let span = token.span();
        match token.into_kind() {
            TokenKind::Identifier(name) => Some(Identifier { name, span }),
            _ => unreachable!("expect() matched an Identifier token"),
        }
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("current", self.stream.current())
            .field("diagnostics", &self.diagnostics.len())
            .field("panic_mode", &self.panic_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::has_errors;

    #[test]
    fn parses_two_passages() {
        let (script, diagnostics) = parse(":: Start\nHello.\n-> End\n\n:: End\nBye.\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(script.passages.len(), 2);
        assert_eq!(script.passages[0].name.name, "Start");
        assert_eq!(script.passages[1].name.name, "End");
        assert_eq!(script.passages[0].body.len(), 2);
    }

    #[test]
    fn parses_passage_tags() {
        let (script, diagnostics) = parse(":: Cellar [dark, spooky]\n");
        assert!(diagnostics.is_empty());
        let tags: Vec<_> = script.passages[0]
            .tags
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(tags, vec!["dark", "spooky"]);
    }

    #[test]
    fn parses_metadata_and_include() {
        let src = "@@ title: The Crossing\n>> include \"castle.weft\" as castle\n:: Start\n";
        let (script, diagnostics) = parse(src);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(script.metadata_value("title").unwrap(), "The Crossing");
        assert_eq!(script.includes.len(), 1);
        assert_eq!(script.includes[0].path, "castle.weft");
        assert_eq!(script.includes[0].alias.as_ref().unwrap().name, "castle");
    }

    #[test]
    fn include_without_alias() {
        let (script, diagnostics) = parse(">> include \"common.weft\"\n");
        assert!(diagnostics.is_empty());
        assert!(script.includes[0].alias.is_none());
    }

    #[test]
    fn import_is_a_synonym_for_include() {
        let (script, diagnostics) = parse(">> import \"common.weft\"\n:: Start\nHi.\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(script.includes[0].path, "common.weft");
        assert!(script.includes[0].alias.is_none());

        let (script, diagnostics) = parse(">> import \"keep.weft\" as keep\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(script.includes[0].alias.as_ref().unwrap().name, "keep");
    }

    #[test]
    fn malformed_passage_header_recovers() {
        let (script, diagnostics) = parse(":: \nstill text\n:: Real\nBody.\n");
        assert!(diagnostics
            .iter()
            .any(|d| d.code == codes::MALFORMED_PASSAGE));
        // The later passage still parses.
        assert!(script.passage("Real").is_some());
    }

    #[test]
    fn content_before_first_passage_goes_to_preamble() {
        let (script, diagnostics) = parse("stray text\n:: Start\n");
        assert!(diagnostics.is_empty());
        assert_eq!(script.preamble.len(), 1);
        assert_eq!(script.passages.len(), 1);
    }

    #[test]
    fn error_recovery_reports_once_per_statement() {
        // Both bad lines report, but each only once.
        let (_, diagnostics) = parse(":: S\n~ = 1\n~ = 2\n");
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        assert_eq!(errors, 2);
    }

    #[test]
    fn keeps_lexer_diagnostics() {
        let (_, diagnostics) = parse(":: S\n~ $x = \"open\n");
        assert!(diagnostics
            .iter()
            .any(|d| d.code == codes::UNTERMINATED_STRING));
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn divert_with_arguments() {
        let (script, diagnostics) = parse(":: S\n->-> Shop(3, $gold)\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let Statement::Tunnel(divert) = &script.passages[0].body[0] else {
            panic!("expected tunnel statement");
        };
        assert_eq!(divert.target.name, "Shop");
        assert_eq!(divert.args.len(), 2);
    }
}
