// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Statement-level parsing: choices, assignments, diverts, text lines,
//! and conditionals.
//!
//! The trickiest production is the brace construct. `{` has three
//! readings, disambiguated by what follows the expression:
//!
//! - `{ expr }` — an interpolation segment;
//! - `{ expr: a | b }` — an inline conditional segment;
//! - `{ expr:` followed by a newline — a block conditional statement
//!   whose branches run until the matching line-leading `}`.
//!
//! [`Parser::parse_brace_construct`] parses all three and reports which
//! one it found; text-line parsing promotes a block result from segment
//! to statement.

use crate::ast::{
    AssignOp, AssignTarget, Assignment, Choice, CondBranch, Conditional, Expr, IndexKind,
    InlineConditional, Statement, TextSegment,
};
use crate::diagnostics::{codes, Diagnostic};
use crate::source_analysis::TokenKind;

use super::{BlockContext, Parser};

/// Where a segment run is being parsed, which decides its terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SegmentPlace {
    /// A narrative line; only the line end stops it.
    Line,
    /// Choice text; `]` stops it.
    ChoiceText,
    /// An inline-conditional arm; `|` and `}` stop it.
    Inline,
}

/// How a segment run stopped.
#[derive(Debug)]
pub(super) enum SegmentStop {
    LineEnd,
    Pipe,
    CloseBrace,
    CloseBracket,
    /// A brace construct turned out to be a block conditional; the
    /// conditional has been fully parsed.
    Block(Conditional),
}

/// What a brace construct turned out to be.
pub(super) enum BraceOutcome {
    Segment(TextSegment),
    Block(Conditional),
}

impl Parser {
    /// Parses one statement, appending the result.
    ///
    /// Takes the output vector rather than returning, because a text
    /// line that runs into a block conditional produces two statements.
    pub(super) fn parse_statement_into(&mut self, out: &mut Vec<Statement>) {
        match self.stream.current() {
            TokenKind::ChoiceSticky | TokenKind::ChoiceOnce => out.push(self.parse_choice()),
            TokenKind::AssignMarker => out.push(self.parse_assignment()),
            TokenKind::DivertArrow => {
                let start = self.stream.current_span();
                self.stream.next();
                match self.parse_divert_target() {
                    Some(divert) => {
                        self.expect_line_end(codes::MALFORMED_DIVERT, "a divert");
                        out.push(Statement::Divert(divert));
                    }
                    None => {
                        self.synchronize();
                        out.push(Statement::Error { span: start });
                    }
                }
            }
            TokenKind::TunnelArrow => {
                let start = self.stream.current_span();
                self.stream.next();
                if self.at_line_end() {
                    // A bare `->->` returns from the current tunnel.
                    out.push(Statement::TunnelReturn { span: start });
                    return;
                }
                match self.parse_divert_target() {
                    Some(divert) => {
                        self.expect_line_end(codes::MALFORMED_DIVERT, "a tunnel call");
                        out.push(Statement::Tunnel(divert));
                    }
                    None => {
                        self.synchronize();
                        out.push(Statement::Error { span: start });
                    }
                }
            }
            TokenKind::ThreadArrow => {
                let start = self.stream.current_span();
                self.stream.next();
                match self.parse_divert_target() {
                    Some(divert) => {
                        self.expect_line_end(codes::MALFORMED_DIVERT, "a thread");
                        out.push(Statement::Thread(divert));
                    }
                    None => {
                        self.synchronize();
                        out.push(Statement::Error { span: start });
                    }
                }
            }
            TokenKind::Error(_) => {
                // The lexer already reported this region.
                let span = self.stream.current_span();
                self.stream.next();
                out.push(Statement::Error { span });
            }
            _ => self.parse_text_line(out),
        }
    }

    /// Parses a narrative line, or the block conditional it opens into.
    fn parse_text_line(&mut self, out: &mut Vec<Statement>) {
        let (segments, stop) = self.parse_segments(SegmentPlace::Line);
        if let Some(statement) = text_statement(segments) {
            out.push(statement);
        }
        if let SegmentStop::Block(conditional) = stop {
            out.push(Statement::Conditional(conditional));
        }
    }

    // ========================================================================
    // Choices
    // ========================================================================

    /// Parses `+`/`*` `{condition}` `[text]` `-> target` and any block
    /// indented under the line.
    fn parse_choice(&mut self) -> Statement {
        let start = self.stream.current_span();
        let sticky = matches!(self.stream.current(), TokenKind::ChoiceSticky);
        self.stream.next();

        let mut condition = None;
        if self.stream.eat(&TokenKind::LeftBrace).is_some() {
            let expr = self.parse_expression();
            if self
                .expect(
                    &TokenKind::RightBrace,
                    codes::MALFORMED_CHOICE,
                    "choice condition",
                )
                .is_none()
            {
                self.synchronize();
            }
            condition = Some(expr);
        }

        let mut text = Vec::new();
        if self.stream.eat(&TokenKind::LeftBracket).is_some() {
            let (segments, stop) = self.parse_segments(SegmentPlace::ChoiceText);
            text = segments;
            if !matches!(stop, SegmentStop::CloseBracket) {
                self.error(Diagnostic::error(
                    codes::MALFORMED_CHOICE,
                    "missing `]` after choice text",
                    self.stream.current_span(),
                ));
            }
        } else {
            self.error(Diagnostic::error(
                codes::MALFORMED_CHOICE,
                format!(
                    "expected `[` choice text, found {}",
                    self.stream.current().describe()
                ),
                self.stream.current_span(),
            ));
            self.synchronize();
        }

        let mut target = None;
        if self.stream.eat(&TokenKind::DivertArrow).is_some() {
            target = self.parse_divert_target();
            if target.is_none() {
                self.synchronize();
            }
        }
        self.expect_line_end(codes::MALFORMED_CHOICE, "a choice");

        // A newline followed directly by an indent opens the choice's
        // nested block.
        let mut body = Vec::new();
        if *self.stream.current() == TokenKind::Newline
            && *self.stream.peek(1).kind() == TokenKind::Indent
        {
            self.stream.next();
            self.stream.next();
            body = self.parse_statements(BlockContext::ChoiceBody);
        }

        let span = start.merge(self.stream.previous_span());
        Statement::Choice(Choice {
            sticky,
            condition,
            text,
            target,
            body,
            span,
        })
    }

    // ========================================================================
    // Assignments
    // ========================================================================

    /// Parses `~ $name[index] op expression`.
    fn parse_assignment(&mut self) -> Statement {
        let start = self.stream.current_span();
        self.stream.next(); // ~

        let (name, name_span) = match self.stream.current().clone() {
            TokenKind::Variable(name) => {
                let span = self.stream.current_span();
                self.stream.next();
                (name, span)
            }
            TokenKind::Identifier(name) => {
                // A common slip: writing `gold` for `$gold`. Recover by
                // treating it as the variable it almost certainly is.
                let span = self.stream.current_span();
                self.error_no_panic(
                    Diagnostic::error(
                        codes::BARE_NAME,
                        format!("`{name}` is not a variable reference"),
                        span,
                    )
                    .with_suggestion(format!("write `${name}` to reference the variable")),
                );
                self.stream.next();
                (name, span)
            }
            _ => {
                self.error(Diagnostic::error(
                    codes::MALFORMED_ASSIGNMENT,
                    format!(
                        "expected a `$variable` after `~`, found {}",
                        self.stream.current().describe()
                    ),
                    self.stream.current_span(),
                ));
                self.synchronize();
                return Statement::Error {
                    span: start.merge(self.stream.previous_span()),
                };
            }
        };

        let mut index = None;
        if self.stream.eat(&TokenKind::LeftBracket).is_some() {
            if self.stream.eat(&TokenKind::RightBracket).is_some() {
                index = Some(IndexKind::Append);
            } else {
                let expr = self.parse_expression();
                if self
                    .expect(
                        &TokenKind::RightBracket,
                        codes::MALFORMED_ASSIGNMENT,
                        "assignment index",
                    )
                    .is_none()
                {
                    self.synchronize();
                }
                index = Some(IndexKind::Expr(Box::new(expr)));
            }
        }
        let target_span = name_span.merge(self.stream.previous_span());

        let op = match self.stream.current() {
            TokenKind::Assign => AssignOp::Set,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Sub,
            TokenKind::StarAssign => AssignOp::Mul,
            TokenKind::SlashAssign => AssignOp::Div,
            _ => {
                self.error(Diagnostic::error(
                    codes::MALFORMED_ASSIGNMENT,
                    format!(
                        "expected an assignment operator, found {}",
                        self.stream.current().describe()
                    ),
                    self.stream.current_span(),
                ));
                self.synchronize();
                return Statement::Error {
                    span: start.merge(self.stream.previous_span()),
                };
            }
        };
        let op_span = self.stream.current_span();
        self.stream.next();

        if matches!(index, Some(IndexKind::Append)) && op != AssignOp::Set {
            self.error_no_panic(Diagnostic::error(
                codes::MALFORMED_ASSIGNMENT,
                "`[]` append cannot be combined with a compound assignment",
                op_span,
            ));
        }

        let value = self.parse_expression();
        self.expect_line_end(codes::MALFORMED_ASSIGNMENT, "an assignment");
        let span = start.merge(self.stream.previous_span());
        Statement::Assignment(Assignment {
            target: AssignTarget {
                name,
                index,
                resolved: None,
                span: target_span,
            },
            op,
            value,
            span,
        })
    }

    // ========================================================================
    // Text segments and brace constructs
    // ========================================================================

    /// Parses a run of text segments for the given place.
    pub(super) fn parse_segments(
        &mut self,
        place: SegmentPlace,
    ) -> (Vec<TextSegment>, SegmentStop) {
        let mut segments = Vec::new();
        loop {
            if self.is_aborted() {
                return (segments, SegmentStop::LineEnd);
            }
            match self.stream.current() {
                TokenKind::Text(_) => {
                    let token = self.stream.next();
                    let span = token.span();
                    let TokenKind::Text(text) = token.into_kind() else {
                        unreachable!("matched a Text token");
                    };
                    segments.push(TextSegment::Text { text, span });
                }
                TokenKind::LeftBrace => match self.parse_brace_construct() {
                    BraceOutcome::Segment(segment) => segments.push(segment),
                    BraceOutcome::Block(conditional) => {
                        if place == SegmentPlace::Line {
                            return (segments, SegmentStop::Block(conditional));
                        }
                        // Already fully consumed from the stream; it just
                        // cannot live inside choice text or an inline arm.
                        self.error(Diagnostic::error(
                            codes::MALFORMED_CONDITIONAL,
                            "a multi-line conditional is not allowed here",
                            conditional.span,
                        ));
                    }
                },
                TokenKind::RightBracket if place == SegmentPlace::ChoiceText => {
                    self.stream.next();
                    return (segments, SegmentStop::CloseBracket);
                }
                TokenKind::Pipe if place == SegmentPlace::Inline => {
                    self.stream.next();
                    return (segments, SegmentStop::Pipe);
                }
                TokenKind::RightBrace if place == SegmentPlace::Inline => {
                    self.stream.next();
                    return (segments, SegmentStop::CloseBrace);
                }
                TokenKind::Indent | TokenKind::Dedent => {
                    return (segments, SegmentStop::LineEnd);
                }
                kind if kind.is_line_end() => {
                    return (segments, SegmentStop::LineEnd);
                }
                TokenKind::Error(_) => {
                    // The lexer already reported this character.
                    self.stream.next();
                }
                other => {
                    self.error(Diagnostic::error(
                        codes::UNEXPECTED_TOKEN,
                        format!("unexpected {} in text", other.describe()),
                        self.stream.current_span(),
                    ));
                    self.stream.next();
                }
            }
        }
    }

    /// Parses a `{ ... }` construct from the opening brace.
    pub(super) fn parse_brace_construct(&mut self) -> BraceOutcome {
        let start = self.stream.current_span();
        self.stream.next(); // {
        let expr = self.parse_expression();

        match self.stream.current() {
            TokenKind::RightBrace => {
                self.stream.next();
                BraceOutcome::Segment(TextSegment::Interpolation(expr))
            }
            TokenKind::Colon => {
                self.stream.next();
                let (then_segments, stop) = self.parse_segments(SegmentPlace::Inline);
                match stop {
                    SegmentStop::CloseBrace => {
                        let span = start.merge(self.stream.previous_span());
                        BraceOutcome::Segment(TextSegment::Conditional(InlineConditional {
                            condition: expr,
                            then_segments,
                            else_segments: None,
                            span,
                        }))
                    }
                    SegmentStop::Pipe => self.parse_inline_else(expr, then_segments, start),
                    SegmentStop::LineEnd => BraceOutcome::Block(self.parse_block_conditional(
                        expr,
                        then_segments,
                        None,
                        start,
                    )),
                    SegmentStop::CloseBracket | SegmentStop::Block(_) => {
                        unreachable!("inline segments stop only at `|`, `}}`, or line end")
                    }
                }
            }
            kind if kind.is_line_end() => {
                // The lexer already reported the missing `}`.
                BraceOutcome::Segment(TextSegment::Interpolation(expr))
            }
            other => {
                self.error(Diagnostic::error(
                    codes::UNEXPECTED_TOKEN,
                    format!("expected `}}` or `:`, found {}", other.describe()),
                    self.stream.current_span(),
                ));
                self.synchronize();
                BraceOutcome::Segment(TextSegment::Interpolation(expr))
            }
        }
    }

    /// Parses the arm after the `|` of an inline conditional.
    fn parse_inline_else(
        &mut self,
        condition: Expr,
        then_segments: Vec<TextSegment>,
        start: crate::source_analysis::Span,
    ) -> BraceOutcome {
        let mut else_segments = Vec::new();
        loop {
            let (segments, stop) = self.parse_segments(SegmentPlace::Inline);
            else_segments.extend(segments);
            match stop {
                SegmentStop::CloseBrace => {
                    let span = start.merge(self.stream.previous_span());
                    return BraceOutcome::Segment(TextSegment::Conditional(InlineConditional {
                        condition,
                        then_segments,
                        else_segments: Some(else_segments),
                        span,
                    }));
                }
                SegmentStop::Pipe => {
                    self.error_no_panic(Diagnostic::error(
                        codes::MALFORMED_CONDITIONAL,
                        "an inline conditional has at most one `|` arm",
                        self.stream.previous_span(),
                    ));
                    // Fold the extra arm into the else text.
                }
                SegmentStop::LineEnd => {
                    // Spilled onto further lines: a block conditional
                    // whose else arm began inline.
                    return BraceOutcome::Block(self.parse_block_conditional(
                        condition,
                        then_segments,
                        Some(else_segments),
                        start,
                    ));
                }
                SegmentStop::CloseBracket | SegmentStop::Block(_) => {
                    unreachable!("inline segments stop only at `|`, `}}`, or line end")
                }
            }
        }
    }

    /// Parses the remaining lines of a block conditional, after the
    /// first branch's condition and any inline leading segments.
    fn parse_block_conditional(
        &mut self,
        first_condition: Expr,
        leading: Vec<TextSegment>,
        else_leading: Option<Vec<TextSegment>>,
        start: crate::source_analysis::Span,
    ) -> Conditional {
        let mut branches: Vec<CondBranch> = Vec::new();
        let mut else_body: Option<Vec<Statement>> = None;

        // The arm being accumulated; `None` condition means the else arm.
        let mut condition = Some(first_condition);
        let mut body: Vec<Statement> = text_statement(leading).into_iter().collect();
        if let Some(else_segments) = else_leading {
            finish_arm(&mut branches, &mut else_body, &mut condition, &mut body);
            body = text_statement(else_segments).into_iter().collect();
        }

        loop {
            if self.is_aborted() {
                break;
            }
            body.extend(self.parse_statements(BlockContext::ConditionalBranch));
            match self.stream.current() {
                TokenKind::RightBrace => {
                    self.stream.next();
                    break;
                }
                TokenKind::BranchMarker => {
                    self.stream.next();
                    let after_else = condition.is_none();
                    finish_arm(&mut branches, &mut else_body, &mut condition, &mut body);

                    if self.stream.eat(&TokenKind::Else).is_some() {
                        if after_else {
                            self.error_no_panic(Diagnostic::error(
                                codes::MALFORMED_CONDITIONAL,
                                "duplicate `else` branch in conditional",
                                self.stream.previous_span(),
                            ));
                        }
                        condition = None;
                    } else {
                        if after_else {
                            self.error_no_panic(Diagnostic::error(
                                codes::MALFORMED_CONDITIONAL,
                                "conditional branch after `else`",
                                self.stream.current_span(),
                            ));
                        }
                        condition = Some(self.parse_expression());
                    }
                    if self
                        .expect(
                            &TokenKind::Colon,
                            codes::MALFORMED_CONDITIONAL,
                            "conditional branch",
                        )
                        .is_none()
                    {
                        self.synchronize();
                    }
                    let (segments, stop) = self.parse_segments(SegmentPlace::Line);
                    body = text_statement(segments).into_iter().collect();
                    if let SegmentStop::Block(nested) = stop {
                        body.push(Statement::Conditional(nested));
                    }
                }
                _ => {
                    // Eof, a passage header, or a directive: the `}` never
                    // arrived.
                    self.error(Diagnostic::error(
                        codes::MALFORMED_CONDITIONAL,
                        "unterminated conditional; expected a closing `}` line",
                        self.stream.current_span(),
                    ));
                    break;
                }
            }
        }
        finish_arm(&mut branches, &mut else_body, &mut condition, &mut body);

        Conditional {
            branches,
            else_body,
            span: start.merge(self.stream.previous_span()),
        }
    }
}

/// Wraps a segment run into a text statement, if it has any content.
fn text_statement(segments: Vec<TextSegment>) -> Option<Statement> {
    let first = segments.first()?.span();
    let last = segments.last()?.span();
    Some(Statement::Text {
        span: first.merge(last),
        segments,
    })
}

/// Closes out the arm being accumulated.
fn finish_arm(
    branches: &mut Vec<CondBranch>,
    else_body: &mut Option<Vec<Statement>>,
    condition: &mut Option<Expr>,
    body: &mut Vec<Statement>,
) {
    let body = std::mem::take(body);
    match condition.take() {
        Some(condition) => {
            let span = body
                .last()
                .map_or(condition.span(), |s| condition.span().merge(s.span()));
            branches.push(CondBranch {
                condition,
                body,
                span,
            });
        }
        None => match else_body {
            // A duplicate else was already reported; keep its statements.
            Some(existing) => existing.extend(body),
            None => *else_body = Some(body),
        },
    }
}
