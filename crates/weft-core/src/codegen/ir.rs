// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! The compiled story representation.
//!
//! A [`Story`] is the compiler's output: a flat, serializable structure a
//! runtime can execute without ever seeing source text. Names are
//! resolved to indices — [`PassageId`] into [`Story::passages`],
//! [`VariableId`] into [`Story::variables`] — and every element carries a
//! unique [`ElementId`] that the source map resolves back to a span.

use ecow::EcoString;
use serde::{Deserialize, Serialize};

/// Index of a passage within [`Story::passages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassageId(pub u32);

/// Index of a variable within [`Story::variables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableId(pub u32);

/// A story-unique element identifier, assigned in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

/// A complete compiled story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// `@@` metadata, in source order with later duplicate keys dropped
    /// in favor of their final value.
    pub metadata: Vec<(EcoString, EcoString)>,
    /// Where execution begins.
    pub start: PassageId,
    pub passages: Vec<PassageIr>,
    /// The variable table, in declaration order.
    pub variables: Vec<VariableDecl>,
}

impl Story {
    /// Looks up a passage id by name.
    #[must_use]
    pub fn passage_id(&self, name: &str) -> Option<PassageId> {
        self.passages
            .iter()
            .position(|p| p.name == name)
            .map(|i| PassageId(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    #[must_use]
    pub fn passage(&self, id: PassageId) -> Option<&PassageIr> {
        self.passages.get(id.0 as usize)
    }
}

/// One entry of the story's variable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: EcoString,
    /// Inferred from the first value assigned.
    pub ty: VarType,
    /// The first assigned value, when it is a compile-time constant.
    pub default: Option<ExprIr>,
}

/// The inferred type of a story variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Int,
    Float,
    Str,
    Bool,
    List,
    /// The first assignment was not a literal.
    Unknown,
}

/// One compiled passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageIr {
    pub name: EcoString,
    pub tags: Vec<EcoString>,
    pub elements: Vec<Element>,
}

/// A story element with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
}

/// What an element does when execution reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    /// Renders one line of output from its parts.
    Line { parts: Vec<Part> },
    /// Writes a variable.
    Set { var: VariableId, value: ExprIr },
    /// Writes one element of a list variable.
    SetIndex {
        var: VariableId,
        index: ExprIr,
        value: ExprIr,
    },
    /// Appends to a list variable.
    Append { var: VariableId, value: ExprIr },
    /// Runs the first arm whose condition holds, else the else arm.
    Branch {
        arms: Vec<BranchArm>,
        else_arm: Vec<Element>,
    },
    /// Offers a choice to the player.
    Choice {
        sticky: bool,
        condition: Option<ExprIr>,
        parts: Vec<Part>,
        target: Option<DivertIr>,
        body: Vec<Element>,
    },
    /// Jumps to another passage.
    Divert { target: DivertIr },
    /// Jumps to another passage, pushing a return point.
    Tunnel { target: DivertIr },
    /// Pops back to the most recent tunnel call site.
    TunnelReturn,
    /// Splices another passage's content in place.
    Thread { target: DivertIr },
}

/// A resolved jump target with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivertIr {
    pub passage: PassageId,
    pub args: Vec<ExprIr>,
}

/// One guarded arm of a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchArm {
    pub condition: ExprIr,
    pub elements: Vec<Element>,
}

/// A piece of a rendered line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(EcoString),
    /// Renders the expression's value in place.
    Expr(ExprIr),
    /// Renders one of two alternatives.
    Cond {
        condition: ExprIr,
        then_parts: Vec<Part>,
        else_parts: Vec<Part>,
    },
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprIr {
    Literal(ValueIr),
    Var { var: VariableId },
    Index { var: VariableId, index: Box<ExprIr> },
    List(Vec<ExprIr>),
    Call { function: EcoString, args: Vec<ExprIr> },
    Binary {
        op: BinOp,
        left: Box<ExprIr>,
        right: Box<ExprIr>,
    },
    Unary { op: UnOp, operand: Box<ExprIr> },
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueIr {
    Int(i64),
    Float(f64),
    Str(EcoString),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Not,
    Neg,
}

impl From<crate::ast::BinaryOp> for BinOp {
    fn from(op: crate::ast::BinaryOp) -> Self {
        use crate::ast::BinaryOp as Ast;
        match op {
            Ast::Or => BinOp::Or,
            Ast::And => BinOp::And,
            Ast::Eq => BinOp::Eq,
            Ast::NotEq => BinOp::NotEq,
            Ast::Less => BinOp::Less,
            Ast::LessEq => BinOp::LessEq,
            Ast::Greater => BinOp::Greater,
            Ast::GreaterEq => BinOp::GreaterEq,
            Ast::Add => BinOp::Add,
            Ast::Sub => BinOp::Sub,
            Ast::Mul => BinOp::Mul,
            Ast::Div => BinOp::Div,
            Ast::Mod => BinOp::Mod,
        }
    }
}

impl From<crate::ast::UnaryOp> for UnOp {
    fn from(op: crate::ast::UnaryOp) -> Self {
        match op {
            crate::ast::UnaryOp::Not => UnOp::Not,
            crate::ast::UnaryOp::Neg => UnOp::Neg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_round_trips_through_json() {
        let story = Story {
            metadata: vec![("title".into(), "Test".into())],
            start: PassageId(0),
            passages: vec![PassageIr {
                name: "Start".into(),
                tags: vec!["intro".into()],
                elements: vec![Element {
                    id: ElementId(0),
                    kind: ElementKind::Line {
                        parts: vec![
                            Part::Text("Gold: ".into()),
                            Part::Expr(ExprIr::Var { var: VariableId(0) }),
                        ],
                    },
                }],
            }],
            variables: vec![VariableDecl {
                name: "gold".into(),
                ty: VarType::Int,
                default: Some(ExprIr::Literal(ValueIr::Int(0))),
            }],
        };
        let json = serde_json::to_string(&story).expect("serializes");
        let back: Story = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(story, back);
    }

    #[test]
    fn passage_lookup_by_name() {
        let story = Story {
            metadata: Vec::new(),
            start: PassageId(0),
            passages: vec![
                PassageIr {
                    name: "Start".into(),
                    tags: Vec::new(),
                    elements: Vec::new(),
                },
                PassageIr {
                    name: "End".into(),
                    tags: Vec::new(),
                    elements: Vec::new(),
                },
            ],
            variables: Vec::new(),
        };
        assert_eq!(story.passage_id("End"), Some(PassageId(1)));
        assert_eq!(story.passage_id("Missing"), None);
    }
}
