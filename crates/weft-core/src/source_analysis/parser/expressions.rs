// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Expression parsing.
//!
//! Binary operators are parsed by precedence climbing over the table in
//! [`binary_binding_power`]. Unary `not`/`-` bind tighter than any binary
//! operator; postfix `[index]` binds tightest and attaches only to
//! variable references.

use ecow::EcoString;

use crate::ast::{Expr, Identifier, Literal, LiteralKind, UnaryOp, VariableRef};
use crate::diagnostics::{codes, Diagnostic};
use crate::source_analysis::TokenKind;

use super::{binary_binding_power, Parser};

/// Maximum expression nesting before parsing gives up.
///
/// Recursion is also protected by `stacker::maybe_grow`, so the limit is
/// about diagnosing unreasonable input rather than avoiding a crash.
pub(super) const MAX_NESTING_DEPTH: usize = 64;

impl Parser {
    /// Parses a complete expression.
    ///
    /// Uses `stacker::maybe_grow` to extend the stack on the heap if
    /// recursion runs close to the guard page.
    pub(super) fn parse_expression(&mut self) -> Expr {
        stacker::maybe_grow(32 * 1024, 256 * 1024, || self.parse_binary_expression(0))
    }

    /// Increments the nesting depth, reporting when the limit is hit.
    fn enter_nesting(&mut self) -> bool {
        self.nesting_depth += 1;
        if self.nesting_depth > MAX_NESTING_DEPTH {
            self.error(Diagnostic::error(
                codes::NESTING_TOO_DEEP,
                format!("expression nesting is too deep (maximum {MAX_NESTING_DEPTH} levels)"),
                self.stream.current_span(),
            ));
            return false;
        }
        true
    }

    fn leave_nesting(&mut self) {
        self.nesting_depth -= 1;
    }

    /// Precedence climbing: parses operators with binding power at least
    /// `min_bp`, recursing with each operator's right power so equal
    /// levels associate left.
    fn parse_binary_expression(&mut self, min_bp: u8) -> Expr {
        if !self.enter_nesting() {
            self.leave_nesting();
            self.synchronize();
            return Expr::Error {
                span: self.stream.current_span(),
            };
        }

        let mut left = self.parse_unary();
        loop {
            let Some((op, bp)) = binary_binding_power(self.stream.current()) else {
                break;
            };
            if bp.left < min_bp {
                break;
            }
            self.stream.next();
            let right =
                stacker::maybe_grow(32 * 1024, 256 * 1024, || {
                    self.parse_binary_expression(bp.right)
                });
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        self.leave_nesting();
        left
    }

    fn parse_unary(&mut self) -> Expr {
        let op = match self.stream.current() {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let start = self.stream.current_span();
        self.stream.next();

        if !self.enter_nesting() {
            self.leave_nesting();
            self.synchronize();
            return Expr::Error { span: start };
        }
        let operand = self.parse_unary();
        self.leave_nesting();

        let span = start.merge(operand.span());
        Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        }
    }

    /// Postfix `[index]`, valid only on `$variable` references.
    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        while *self.stream.current() == TokenKind::LeftBracket {
            self.stream.next();
            let index = self.parse_expression();
            if self
                .expect(
                    &TokenKind::RightBracket,
                    codes::UNEXPECTED_TOKEN,
                    "index expression",
                )
                .is_none()
            {
                self.synchronize();
            }
            let span = expr.span().merge(self.stream.previous_span());
            match expr {
                Expr::Variable(variable) if variable.index.is_none() => {
                    expr = Expr::Variable(VariableRef {
                        index: Some(Box::new(index)),
                        span,
                        ..variable
                    });
                }
                other => {
                    self.error_no_panic(Diagnostic::error(
                        codes::INVALID_INDEX_TARGET,
                        "only a `$variable` can be indexed",
                        other.span(),
                    ));
                    expr = Expr::Error { span };
                }
            }
        }
        expr
    }

    fn parse_primary(&mut self) -> Expr {
        let span = self.stream.current_span();
        match self.stream.current().clone() {
            TokenKind::Integer(text) => {
                self.stream.next();
                match text.parse::<i64>() {
                    Ok(value) => Expr::Literal(Literal {
                        kind: LiteralKind::Int(value),
                        span,
                    }),
                    Err(_) => {
                        self.error_no_panic(Diagnostic::error(
                            codes::INVALID_NUMBER,
                            format!("integer literal `{text}` is out of range"),
                            span,
                        ));
                        Expr::Error { span }
                    }
                }
            }
            TokenKind::Float(text) => {
                self.stream.next();
                match text.parse::<f64>() {
                    Ok(value) => Expr::Literal(Literal {
                        kind: LiteralKind::Float(value),
                        span,
                    }),
                    Err(_) => {
                        self.error_no_panic(Diagnostic::error(
                            codes::INVALID_NUMBER,
                            format!("`{text}` is not a valid number"),
                            span,
                        ));
                        Expr::Error { span }
                    }
                }
            }
            TokenKind::String(value) => {
                self.stream.next();
                Expr::Literal(Literal {
                    kind: LiteralKind::Str(value),
                    span,
                })
            }
            TokenKind::True => {
                self.stream.next();
                Expr::Literal(Literal {
                    kind: LiteralKind::Bool(true),
                    span,
                })
            }
            TokenKind::False => {
                self.stream.next();
                Expr::Literal(Literal {
                    kind: LiteralKind::Bool(false),
                    span,
                })
            }
            TokenKind::Variable(name) => {
                self.stream.next();
                Expr::Variable(VariableRef {
                    name,
                    index: None,
                    resolved: None,
                    span,
                })
            }
            TokenKind::Identifier(name) => {
                if *self.stream.peek(1).kind() == TokenKind::LeftParen {
                    return self.parse_call(name, span);
                }
                self.stream.next();
                self.error_no_panic(
                    Diagnostic::error(
                        codes::BARE_NAME,
                        format!("`{name}` is not a variable reference"),
                        span,
                    )
                    .with_suggestion(format!("write `${name}` to reference the variable")),
                );
                Expr::Error { span }
            }
            TokenKind::LeftParen => {
                self.stream.next();
                let expr = self.parse_expression();
                if self
                    .expect(
                        &TokenKind::RightParen,
                        codes::UNEXPECTED_TOKEN,
                        "parenthesized expression",
                    )
                    .is_none()
                {
                    self.synchronize();
                }
                expr
            }
            TokenKind::LeftBracket => self.parse_list(span),
            TokenKind::Error(_) => {
                // The lexer already reported this region.
                self.stream.next();
                Expr::Error { span }
            }
            other => {
                self.error(Diagnostic::error(
                    codes::EXPECTED_EXPRESSION,
                    format!("expected an expression, found {}", other.describe()),
                    span,
                ));
                // Consume the offender unless it closes the line, so the
                // parser always makes progress.
                if !other.is_line_end() {
                    self.stream.next();
                }
                Expr::Error { span }
            }
        }
    }

    /// Parses `name(arg, ...)`. Whether `name` is a known function with
    /// the right arity is semantic analysis' problem.
    fn parse_call(&mut self, name: EcoString, name_span: crate::source_analysis::Span) -> Expr {
        self.stream.next(); // identifier
        self.stream.next(); // (
        let mut args = Vec::new();
        loop {
            match self.stream.current() {
                TokenKind::RightParen => {
                    self.stream.next();
                    break;
                }
                TokenKind::Newline | TokenKind::Eof => {
                    self.error(Diagnostic::error(
                        codes::UNEXPECTED_TOKEN,
                        format!("unclosed `(` in call to `{name}`"),
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
                            codes::UNEXPECTED_TOKEN,
                            format!(
                                "expected `,` or `)` in call arguments, found {}",
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
        let span = name_span.merge(self.stream.previous_span());
        Expr::Call {
            name: Identifier {
                name,
                span: name_span,
            },
            args,
            span,
        }
    }

    /// Parses a `[a, b, c]` list literal from its opening bracket.
    fn parse_list(&mut self, start: crate::source_analysis::Span) -> Expr {
        self.stream.next(); // [
        let mut elements = Vec::new();
        loop {
            match self.stream.current() {
                TokenKind::RightBracket => {
                    self.stream.next();
                    break;
                }
                TokenKind::Newline | TokenKind::Eof => {
                    self.error(Diagnostic::error(
                        codes::UNEXPECTED_TOKEN,
                        "unclosed `[` in list literal",
                        self.stream.current_span(),
                    ));
                    break;
                }
                _ => {
                    elements.push(self.parse_expression());
                    if self.stream.eat(&TokenKind::Comma).is_none()
                        && *self.stream.current() != TokenKind::RightBracket
                    {
                        self.error(Diagnostic::error(
                            codes::UNEXPECTED_TOKEN,
                            format!(
                                "expected `,` or `]` in list literal, found {}",
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
        let span = start.merge(self.stream.previous_span());
        Expr::List { elements, span }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;
    use crate::ast::{BinaryOp, Statement};

    /// Parses `~ $x = <source>` and returns the assigned expression.
    fn expr(source: &str) -> Expr {
        let (script, diagnostics) = parse(&format!(":: S\n~ $x = {source}\n"));
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let Statement::Assignment(assignment) = script.passages[0].body[0].clone() else {
            panic!("expected assignment");
        };
        assignment.value
    }

    fn binary_op(expr: &Expr) -> BinaryOp {
        let Expr::Binary { op, .. } = expr else {
            panic!("expected binary expression, got {expr:?}");
        };
        *op
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        // $a + $b * $c parses as $a + ($b * $c)
        let e = expr("$a + $b * $c");
        assert_eq!(binary_op(&e), BinaryOp::Add);
        let Expr::Binary { right, .. } = &e else {
            unreachable!()
        };
        assert_eq!(binary_op(right), BinaryOp::Mul);
    }

    #[test]
    fn same_level_associates_left() {
        // $a - $b - $c parses as ($a - $b) - $c
        let e = expr("$a - $b - $c");
        let Expr::Binary { op, left, right, .. } = &e else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Sub);
        assert_eq!(binary_op(left), BinaryOp::Sub);
        assert!(matches!(right.as_ref(), Expr::Variable(_)));
    }

    #[test]
    fn comparison_binds_tighter_than_logic() {
        // $a > 1 and $b < 2 parses as ($a > 1) and ($b < 2)
        let e = expr("$a > 1 and $b < 2");
        assert_eq!(binary_op(&e), BinaryOp::And);
    }

    #[test]
    fn or_is_loosest() {
        let e = expr("$a and $b or $c");
        assert_eq!(binary_op(&e), BinaryOp::Or);
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        // not $a and $b parses as (not $a) and $b
        let e = expr("not $a and $b");
        assert_eq!(binary_op(&e), BinaryOp::And);
        let Expr::Binary { left, .. } = &e else {
            unreachable!()
        };
        assert!(matches!(left.as_ref(), Expr::Unary { .. }));
    }

    #[test]
    fn parentheses_override_precedence() {
        let e = expr("($a + $b) * $c");
        assert_eq!(binary_op(&e), BinaryOp::Mul);
    }

    #[test]
    fn negation_nests() {
        let e = expr("-(-$a)");
        let Expr::Unary { operand, .. } = &e else {
            panic!("expected unary");
        };
        assert!(matches!(operand.as_ref(), Expr::Unary { .. }));
    }

    #[test]
    fn call_with_arguments() {
        let e = expr("random(1, 6)");
        let Expr::Call { name, args, .. } = &e else {
            panic!("expected call");
        };
        assert_eq!(name.name, "random");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn list_literal() {
        let e = expr("[1, 2, 3]");
        let Expr::List { elements, .. } = &e else {
            panic!("expected list");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn variable_index() {
        let e = expr("$bag[0]");
        let Expr::Variable(variable) = &e else {
            panic!("expected variable");
        };
        assert!(variable.index.is_some());
    }

    #[test]
    fn float_and_string_literals() {
        assert!(matches!(
            expr("1.5"),
            Expr::Literal(Literal {
                kind: LiteralKind::Float(f),
                ..
            }) if (f - 1.5).abs() < f64::EPSILON
        ));
        assert!(matches!(
            expr("\"hi\""),
            Expr::Literal(Literal {
                kind: LiteralKind::Str(s),
                ..
            }) if s == "hi"
        ));
    }

    #[test]
    fn indexing_a_literal_reports() {
        let (_, diagnostics) = parse(":: S\n~ $x = [1, 2][0]\n");
        assert!(diagnostics
            .iter()
            .any(|d| d.code == codes::INVALID_INDEX_TARGET));
    }

    #[test]
    fn bare_name_in_expression_reports() {
        let (_, diagnostics) = parse(":: S\n~ $x = gold + 1\n");
        let bare = diagnostics
            .iter()
            .find(|d| d.code == codes::BARE_NAME)
            .expect("bare name diagnostic");
        assert!(bare.suggestion.as_ref().unwrap().contains("$gold"));
    }

    #[test]
    fn integer_overflow_reports() {
        let (_, diagnostics) = parse(":: S\n~ $x = 99999999999999999999\n");
        assert!(diagnostics
            .iter()
            .any(|d| d.code == codes::INVALID_NUMBER));
    }

    #[test]
    fn deep_nesting_is_rejected_not_crashed() {
        let opens = "(".repeat(300);
        let closes = ")".repeat(300);
        let (_, diagnostics) = parse(&format!(":: S\n~ $x = {opens}1{closes}\n"));
        assert!(diagnostics
            .iter()
            .any(|d| d.code == codes::NESTING_TOO_DEEP));
    }

    #[test]
    fn missing_operand_recovers() {
        let (script, diagnostics) = parse(":: S\n~ $x = 1 +\nNext.\n");
        assert!(diagnostics
            .iter()
            .any(|d| d.code == codes::EXPECTED_EXPRESSION));
        // The next line still parses as text.
        assert!(script.passages[0]
            .body
            .iter()
            .any(|s| matches!(s, Statement::Text { .. })));
    }
}
