// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! AST traversal.
//!
//! Two traversal traits cover the passes over a [`Script`]:
//!
//! - [`Visitor`] walks a shared tree. Used for collection passes such as
//!   gathering passage declarations or collecting link targets.
//! - [`MutVisitor`] walks a mutable tree. Name resolution uses it to fill
//!   in the `resolved` annotations in place.
//!
//! Each trait method defaults to the matching `walk_*` function, so an
//! implementation overrides only the nodes it cares about and calls the
//! walk function itself to continue into children. Collection passes
//! with no state of their own can use [`ExprWalker`] instead of
//! defining a visitor type.

use crate::ast::{
    Choice, CondBranch, Conditional, Divert, Expr, InlineConditional, Passage, Script, Statement,
    TextSegment,
};

/// A read-only traversal over a script.
pub trait Visitor {
    fn visit_script(&mut self, script: &Script) {
        walk_script(self, script);
    }

    fn visit_passage(&mut self, passage: &Passage) {
        walk_passage(self, passage);
    }

    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_divert(&mut self, divert: &Divert) {
        walk_divert(self, divert);
    }

    fn visit_segment(&mut self, segment: &TextSegment) {
        walk_segment(self, segment);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_script<V: Visitor + ?Sized>(visitor: &mut V, script: &Script) {
    for statement in &script.preamble {
        visitor.visit_statement(statement);
    }
    for passage in &script.passages {
        visitor.visit_passage(passage);
    }
}

pub fn walk_passage<V: Visitor + ?Sized>(visitor: &mut V, passage: &Passage) {
    for statement in &passage.body {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Text { segments, .. } => {
            for segment in segments {
                visitor.visit_segment(segment);
            }
        }
        Statement::Choice(choice) => walk_choice(visitor, choice),
        Statement::Assignment(assignment) => {
            if let Some(crate::ast::IndexKind::Expr(index)) = &assignment.target.index {
                visitor.visit_expr(index);
            }
            visitor.visit_expr(&assignment.value);
        }
        Statement::Conditional(conditional) => walk_conditional(visitor, conditional),
        Statement::Divert(divert) | Statement::Tunnel(divert) | Statement::Thread(divert) => {
            visitor.visit_divert(divert);
        }
        Statement::TunnelReturn { .. } | Statement::Error { .. } => {}
    }
}

fn walk_choice<V: Visitor + ?Sized>(visitor: &mut V, choice: &Choice) {
    if let Some(condition) = &choice.condition {
        visitor.visit_expr(condition);
    }
    for segment in &choice.text {
        visitor.visit_segment(segment);
    }
    if let Some(target) = &choice.target {
        visitor.visit_divert(target);
    }
    for statement in &choice.body {
        visitor.visit_statement(statement);
    }
}

fn walk_conditional<V: Visitor + ?Sized>(visitor: &mut V, conditional: &Conditional) {
    for CondBranch { condition, body, .. } in &conditional.branches {
        visitor.visit_expr(condition);
        for statement in body {
            visitor.visit_statement(statement);
        }
    }
    if let Some(body) = &conditional.else_body {
        for statement in body {
            visitor.visit_statement(statement);
        }
    }
}

pub fn walk_divert<V: Visitor + ?Sized>(visitor: &mut V, divert: &Divert) {
    for arg in &divert.args {
        visitor.visit_expr(arg);
    }
}

pub fn walk_segment<V: Visitor + ?Sized>(visitor: &mut V, segment: &TextSegment) {
    match segment {
        TextSegment::Text { .. } => {}
        TextSegment::Interpolation(expr) => visitor.visit_expr(expr),
        TextSegment::Conditional(InlineConditional {
            condition,
            then_segments,
            else_segments,
            ..
        }) => {
            visitor.visit_expr(condition);
            for segment in then_segments {
                visitor.visit_segment(segment);
            }
            if let Some(segments) = else_segments {
                for segment in segments {
                    visitor.visit_segment(segment);
                }
            }
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Unary { operand, .. } => visitor.visit_expr(operand),
        Expr::Variable(variable) => {
            if let Some(index) = &variable.index {
                visitor.visit_expr(index);
            }
        }
        Expr::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::List { elements, .. } => {
            for element in elements {
                visitor.visit_expr(element);
            }
        }
        Expr::Literal(_) | Expr::Error { .. } => {}
    }
}

/// A [`Visitor`] that applies a closure to every expression, in
/// pre-order.
pub struct ExprWalker<F: FnMut(&Expr)>(pub F);

impl<F: FnMut(&Expr)> Visitor for ExprWalker<F> {
    fn visit_expr(&mut self, expr: &Expr) {
        (self.0)(expr);
        walk_expr(self, expr);
    }
}

/// A mutable traversal over a script.
pub trait MutVisitor {
    fn visit_script(&mut self, script: &mut Script) {
        walk_script_mut(self, script);
    }

    fn visit_passage(&mut self, passage: &mut Passage) {
        walk_passage_mut(self, passage);
    }

    fn visit_statement(&mut self, statement: &mut Statement) {
        walk_statement_mut(self, statement);
    }

    fn visit_divert(&mut self, divert: &mut Divert) {
        walk_divert_mut(self, divert);
    }

    fn visit_segment(&mut self, segment: &mut TextSegment) {
        walk_segment_mut(self, segment);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

pub fn walk_script_mut<V: MutVisitor + ?Sized>(visitor: &mut V, script: &mut Script) {
    for statement in &mut script.preamble {
        visitor.visit_statement(statement);
    }
    for passage in &mut script.passages {
        visitor.visit_passage(passage);
    }
}

pub fn walk_passage_mut<V: MutVisitor + ?Sized>(visitor: &mut V, passage: &mut Passage) {
    for statement in &mut passage.body {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement_mut<V: MutVisitor + ?Sized>(visitor: &mut V, statement: &mut Statement) {
    match statement {
        Statement::Text { segments, .. } => {
            for segment in segments {
                visitor.visit_segment(segment);
            }
        }
        Statement::Choice(choice) => {
            if let Some(condition) = &mut choice.condition {
                visitor.visit_expr(condition);
            }
            for segment in &mut choice.text {
                visitor.visit_segment(segment);
            }
            if let Some(target) = &mut choice.target {
                visitor.visit_divert(target);
            }
            for statement in &mut choice.body {
                visitor.visit_statement(statement);
            }
        }
        Statement::Assignment(assignment) => {
            if let Some(crate::ast::IndexKind::Expr(index)) = &mut assignment.target.index {
                visitor.visit_expr(index);
            }
            visitor.visit_expr(&mut assignment.value);
        }
        Statement::Conditional(conditional) => {
            for branch in &mut conditional.branches {
                visitor.visit_expr(&mut branch.condition);
                for statement in &mut branch.body {
                    visitor.visit_statement(statement);
                }
            }
            if let Some(body) = &mut conditional.else_body {
                for statement in body {
                    visitor.visit_statement(statement);
                }
            }
        }
        Statement::Divert(divert) | Statement::Tunnel(divert) | Statement::Thread(divert) => {
            visitor.visit_divert(divert);
        }
        Statement::TunnelReturn { .. } | Statement::Error { .. } => {}
    }
}

pub fn walk_divert_mut<V: MutVisitor + ?Sized>(visitor: &mut V, divert: &mut Divert) {
    for arg in &mut divert.args {
        visitor.visit_expr(arg);
    }
}

pub fn walk_segment_mut<V: MutVisitor + ?Sized>(visitor: &mut V, segment: &mut TextSegment) {
    match segment {
        TextSegment::Text { .. } => {}
        TextSegment::Interpolation(expr) => visitor.visit_expr(expr),
        TextSegment::Conditional(inline) => {
            visitor.visit_expr(&mut inline.condition);
            for segment in &mut inline.then_segments {
                visitor.visit_segment(segment);
            }
            if let Some(segments) = &mut inline.else_segments {
                for segment in segments {
                    visitor.visit_segment(segment);
                }
            }
        }
    }
}

pub fn walk_expr_mut<V: MutVisitor + ?Sized>(visitor: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Unary { operand, .. } => visitor.visit_expr(operand),
        Expr::Variable(variable) => {
            if let Some(index) = &mut variable.index {
                visitor.visit_expr(index);
            }
        }
        Expr::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::List { elements, .. } => {
            for element in elements {
                visitor.visit_expr(element);
            }
        }
        Expr::Literal(_) | Expr::Error { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Identifier, Literal, LiteralKind, VariableRef};
    use crate::source_analysis::Span;

    struct VariableCounter(usize);

    impl Visitor for VariableCounter {
        fn visit_expr(&mut self, expr: &Expr) {
            if matches!(expr, Expr::Variable(_)) {
                self.0 += 1;
            }
            walk_expr(self, expr);
        }
    }

    fn variable(name: &str) -> Expr {
        Expr::Variable(VariableRef {
            name: name.into(),
            index: None,
            resolved: None,
            span: Span::new(0, 1),
        })
    }

    #[test]
    fn visitor_reaches_nested_expressions() {
        let script = Script {
            metadata: Vec::new(),
            includes: Vec::new(),
            preamble: Vec::new(),
            passages: vec![Passage {
                name: Identifier {
                    name: "Start".into(),
                    span: Span::new(0, 5),
                },
                tags: Vec::new(),
                body: vec![Statement::Text {
                    segments: vec![TextSegment::Conditional(InlineConditional {
                        condition: variable("a"),
                        then_segments: vec![TextSegment::Interpolation(variable("b"))],
                        else_segments: Some(vec![TextSegment::Interpolation(Expr::Binary {
                            op: crate::ast::BinaryOp::Add,
                            left: Box::new(variable("c")),
                            right: Box::new(Expr::Literal(Literal {
                                kind: LiteralKind::Int(1),
                                span: Span::new(0, 1),
                            })),
                            span: Span::new(0, 3),
                        })]),
                        span: Span::new(0, 10),
                    })],
                    span: Span::new(0, 10),
                }],
                span: Span::new(0, 10),
            }],
            span: Span::new(0, 10),
        };

        let mut counter = VariableCounter(0);
        counter.visit_script(&script);
        assert_eq!(counter.0, 3);
    }

    #[test]
    fn expr_walker_gathers_matching_nodes() {
        let expr = Expr::Binary {
            op: crate::ast::BinaryOp::Add,
            left: Box::new(variable("gold")),
            right: Box::new(variable("bonus")),
            span: Span::new(0, 12),
        };
        let mut names = Vec::new();
        let mut walker = ExprWalker(|expr: &Expr| {
            if let Expr::Variable(v) = expr {
                names.push(v.name.clone());
            }
        });
        walker.visit_expr(&expr);
        assert_eq!(names, vec!["gold", "bonus"]);
    }

    struct Renamer;

    impl MutVisitor for Renamer {
        fn visit_expr(&mut self, expr: &mut Expr) {
            if let Expr::Variable(v) = expr {
                v.name = "renamed".into();
            }
            walk_expr_mut(self, expr);
        }
    }

    #[test]
    fn mut_visitor_edits_in_place() {
        let mut expr = Expr::Unary {
            op: crate::ast::UnaryOp::Not,
            operand: Box::new(variable("flag")),
            span: Span::new(0, 5),
        };
        Renamer.visit_expr(&mut expr);
        let Expr::Unary { operand, .. } = &expr else {
            unreachable!()
        };
        let Expr::Variable(v) = operand.as_ref() else {
            unreachable!()
        };
        assert_eq!(v.name, "renamed");
    }
}
