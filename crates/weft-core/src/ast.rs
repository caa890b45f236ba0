// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Abstract syntax tree for Weft scripts.
//!
//! The parser produces one [`Script`] per source file. Every node carries a
//! [`Span`] into the original source; semantic analysis later annotates
//! name references in place with the [`SymbolId`] they resolve to, so the
//! tree doubles as the resolved program.
//!
//! Malformed regions parse to [`Statement::Error`] / [`Expr::Error`] nodes
//! rather than aborting, which keeps later phases total over the tree.

use ecow::EcoString;

use crate::semantic_analysis::SymbolId;
use crate::source_analysis::Span;

/// A parsed script: the root of the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    /// `@@ key: value` directives, in source order.
    pub metadata: Vec<Metadata>,
    /// `>> include "path" as alias` directives.
    pub includes: Vec<Include>,
    /// The passages of the story.
    pub passages: Vec<Passage>,
    /// Statements appearing before the first passage header. Legal for
    /// directives only; semantic analysis diagnoses anything else.
    pub preamble: Vec<Statement>,
    pub span: Span,
}

impl Script {
    /// Looks up a passage by name.
    #[must_use]
    pub fn passage(&self, name: &str) -> Option<&Passage> {
        self.passages.iter().find(|p| p.name.name == name)
    }

    /// Returns the value of a metadata key, if present.
    ///
    /// Later directives shadow earlier ones with the same key.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&EcoString> {
        self.metadata
            .iter()
            .rev()
            .find(|m| m.key.name == key)
            .map(|m| &m.value)
    }
}

/// A name with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: EcoString,
    pub span: Span,
}

/// A `@@ key: value` directive. The value is raw text to end of line.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub key: Identifier,
    pub value: EcoString,
    pub span: Span,
}

/// A `>> include "path" as alias` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub path: EcoString,
    pub path_span: Span,
    /// Namespace alias; included passage names are prefixed `alias.name`.
    pub alias: Option<Identifier>,
    pub span: Span,
}

/// A passage: a named block of statements, introduced by `:: Name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub name: Identifier,
    /// Bracketed tags on the header line, e.g. `:: Cellar [dark, spooky]`.
    pub tags: Vec<Identifier>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// One statement within a passage body.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A line of narrative text, split into literal and dynamic segments.
    Text { segments: Vec<TextSegment>, span: Span },
    /// A `+`/`*` choice.
    Choice(Choice),
    /// A `~` assignment.
    Assignment(Assignment),
    /// A `{ cond: ... }` conditional, inline-promoted or block form.
    Conditional(Conditional),
    /// `-> target`: jump with no return.
    Divert(Divert),
    /// `->-> target`: jump, returning here on tunnel return.
    Tunnel(Divert),
    /// A bare `->->`: return from the current tunnel.
    TunnelReturn { span: Span },
    /// `<- target`: splice another passage's content in place.
    Thread(Divert),
    /// Placeholder for a region that failed to parse.
    Error { span: Span },
}

impl Statement {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Statement::Text { span, .. }
            | Statement::TunnelReturn { span }
            | Statement::Error { span } => *span,
            Statement::Choice(c) => c.span,
            Statement::Assignment(a) => a.span,
            Statement::Conditional(c) => c.span,
            Statement::Divert(d) | Statement::Tunnel(d) | Statement::Thread(d) => d.span,
        }
    }
}

/// A choice line and its nested block.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    /// `+` choices may be taken repeatedly; `*` choices only once.
    pub sticky: bool,
    /// Optional `{condition}` guarding the choice's visibility.
    pub condition: Option<Expr>,
    /// The `[...]` text shown to the player.
    pub text: Vec<TextSegment>,
    /// Optional `-> target` taken when the choice is picked.
    pub target: Option<Divert>,
    /// Statements indented under the choice, run when it is picked.
    pub body: Vec<Statement>,
    pub span: Span,
}

/// A divert target: passage name plus optional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Divert {
    pub target: Identifier,
    /// Arguments for parameterized tunnels, e.g. `->-> Shop(3)`.
    pub args: Vec<Expr>,
    /// Filled in by name resolution.
    pub resolved: Option<SymbolId>,
    pub span: Span,
}

/// A `~` assignment statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: AssignTarget,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

/// The left-hand side of an assignment: a variable, optionally indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignTarget {
    pub name: EcoString,
    pub index: Option<IndexKind>,
    /// Filled in by name resolution.
    pub resolved: Option<SymbolId>,
    pub span: Span,
}

/// What kind of index an assignment target carries.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKind {
    /// `$list[] = value` appends.
    Append,
    /// `$list[expr] = value` writes one element.
    Expr(Box<Expr>),
}

/// Assignment operators. Compound forms lower to read-modify-write during
/// code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    /// The binary operator a compound assignment lowers through.
    #[must_use]
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
        }
    }
}

/// A conditional with one or more guarded branches and an optional else.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub branches: Vec<CondBranch>,
    pub else_body: Option<Vec<Statement>>,
    pub span: Span,
}

/// One guarded branch of a conditional.
#[derive(Debug, Clone, PartialEq)]
pub struct CondBranch {
    pub condition: Expr,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// A piece of a narrative line.
#[derive(Debug, Clone, PartialEq)]
pub enum TextSegment {
    /// Literal text, escapes already resolved.
    Text { text: EcoString, span: Span },
    /// `{ expr }`: the value is rendered in place.
    Interpolation(Expr),
    /// `{ cond: then | else }` within a line.
    Conditional(InlineConditional),
}

impl TextSegment {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            TextSegment::Text { span, .. } => *span,
            TextSegment::Interpolation(e) => e.span(),
            TextSegment::Conditional(c) => c.span,
        }
    }
}

/// An inline conditional inside a text line.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineConditional {
    pub condition: Expr,
    pub then_segments: Vec<TextSegment>,
    pub else_segments: Option<Vec<TextSegment>>,
    pub span: Span,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    /// A `$name` reference, optionally indexed with `[expr]`.
    Variable(VariableRef),
    /// A built-in function call, e.g. `random(1, 6)`.
    Call {
        name: Identifier,
        args: Vec<Expr>,
        span: Span,
    },
    Literal(Literal),
    /// A `[a, b, c]` list literal.
    List { elements: Vec<Expr>, span: Span },
    /// Placeholder for an expression that failed to parse.
    Error { span: Span },
}

impl Expr {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Call { span, .. }
            | Expr::List { span, .. }
            | Expr::Error { span } => *span,
            Expr::Variable(v) => v.span,
            Expr::Literal(l) => l.span,
        }
    }

    /// Returns true if this expression or any subexpression is an error
    /// placeholder.
    #[must_use]
    pub fn contains_error(&self) -> bool {
        match self {
            Expr::Error { .. } => true,
            Expr::Binary { left, right, .. } => left.contains_error() || right.contains_error(),
            Expr::Unary { operand, .. } => operand.contains_error(),
            Expr::Variable(v) => v.index.as_ref().is_some_and(|i| i.contains_error()),
            Expr::Call { args, .. } => args.iter().any(Expr::contains_error),
            Expr::List { elements, .. } => elements.iter().any(Expr::contains_error),
            Expr::Literal(_) => false,
        }
    }
}

/// A `$name` variable reference.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    pub name: EcoString,
    /// Optional `[expr]` element access.
    pub index: Option<Box<Expr>>,
    /// Filled in by name resolution.
    pub resolved: Option<SymbolId>,
    pub span: Span,
}

/// A literal value with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub span: Span,
}

/// The value of a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    Int(i64),
    Float(f64),
    Str(EcoString),
    Bool(bool),
}

/// Binary operators, loosest to tightest:
/// `or` < `and` < equality < comparison < additive < multiplicative.
/// All are left-associative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// The operator's surface syntax.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Unary operators. Both bind tighter than any binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_last_key_wins() {
        let key = |name: &str, at: u32| Identifier {
            name: name.into(),
            span: Span::new(at, at + 1),
        };
        let script = Script {
            metadata: vec![
                Metadata {
                    key: key("title", 0),
                    value: "First".into(),
                    span: Span::new(0, 10),
                },
                Metadata {
                    key: key("title", 20),
                    value: "Second".into(),
                    span: Span::new(20, 30),
                },
            ],
            includes: Vec::new(),
            passages: Vec::new(),
            preamble: Vec::new(),
            span: Span::new(0, 30),
        };
        assert_eq!(script.metadata_value("title").unwrap(), "Second");
        assert_eq!(script.metadata_value("author"), None);
    }

    #[test]
    fn compound_assign_lowering_ops() {
        assert_eq!(AssignOp::Add.binary_op(), Some(BinaryOp::Add));
        assert_eq!(AssignOp::Div.binary_op(), Some(BinaryOp::Div));
        assert_eq!(AssignOp::Set.binary_op(), None);
    }

    #[test]
    fn contains_error_sees_through_nesting() {
        let err = Expr::Error {
            span: Span::new(0, 1),
        };
        let nested = Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expr::Literal(Literal {
                kind: LiteralKind::Int(1),
                span: Span::new(0, 1),
            })),
            right: Box::new(err),
            span: Span::new(0, 3),
        };
        assert!(nested.contains_error());
    }
}
