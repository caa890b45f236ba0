// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Code generation: lowering the resolved AST into a [`Story`].
//!
//! Generation is a straightforward tree walk. The interesting work is in
//! the lowerings:
//!
//! - compound assignments become read-modify-write: `~ $g += 1` lowers
//!   to `Set { g, g + 1 }`;
//! - `~ $list[] = v` lowers to an `Append` element;
//! - names disappear: diverts carry [`PassageId`]s, variables
//!   [`VariableId`]s.
//!
//! Every element gets a story-unique id and a [`SourceMap`] entry, so
//! runtime errors and editor tooling can find their way back to source.
//!
//! Generation refuses to run over a script with error diagnostics; a
//! broken tree has `Error` placeholder nodes that have no sensible
//! lowering.

mod ir;
mod source_map;

pub use ir::{
    BinOp, BranchArm, DivertIr, Element, ElementId, ElementKind, ExprIr, Part, PassageId,
    PassageIr, Story, UnOp, ValueIr, VarType, VariableDecl, VariableId,
};
pub use source_map::{Mapping, SourceMap};

use std::collections::HashMap;

use ecow::EcoString;

use crate::ast::{
    Assignment, Choice, Conditional, Divert, Expr, IndexKind, LiteralKind, Script, Statement,
    TextSegment,
};
use crate::diagnostics::{has_errors, Diagnostic};
use crate::semantic_analysis::{Analysis, SymbolKind};
use crate::source_analysis::Span;

/// Why generation could not produce a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    /// The script has error-severity diagnostics.
    #[error("cannot generate a story while the script has errors")]
    HasErrors,
    /// There is nothing to run.
    #[error("the script declares no passages")]
    NoPassages,
}

/// Generates a story and its source map from an analyzed script.
///
/// `diagnostics` must hold everything accumulated so far (lexing,
/// parsing, and analysis); any error-severity entry refuses generation.
pub fn generate(
    script: &Script,
    analysis: &Analysis,
    diagnostics: &[Diagnostic],
) -> Result<(Story, SourceMap), CodegenError> {
    if has_errors(diagnostics) || has_errors(&analysis.diagnostics) {
        return Err(CodegenError::HasErrors);
    }
    if script.passages.is_empty() {
        return Err(CodegenError::NoPassages);
    }

    let mut generator = Generator::new(script, analysis);

    let mut passages = Vec::new();
    for passage in &script.passages {
        // Duplicate names were already rejected as errors; keep the
        // lookup consistent with the first declaration regardless.
        if generator.passage_ids.get(&passage.name.name)
            != Some(&PassageId(u32::try_from(passages.len()).unwrap_or(u32::MAX)))
        {
            continue;
        }
        let elements = generator.emit_statements(&passage.body);
        passages.push(PassageIr {
            name: passage.name.name.clone(),
            tags: passage.tags.iter().map(|t| t.name.clone()).collect(),
            elements,
        });
    }

    let mut metadata: Vec<(EcoString, EcoString)> = Vec::new();
    for entry in &script.metadata {
        if let Some(slot) = metadata.iter_mut().find(|(key, _)| *key == entry.key.name) {
            slot.1 = entry.value.clone();
        } else {
            metadata.push((entry.key.name.clone(), entry.value.clone()));
        }
    }

    let start = analysis
        .start
        .map(|id| analysis.symbols.get(id).name.clone())
        .and_then(|name| generator.passage_ids.get(&name).copied())
        .unwrap_or(PassageId(0));

    let story = Story {
        metadata,
        start,
        passages,
        variables: generator.variables.clone(),
    };
    Ok((story, generator.map))
}

struct Generator {
    variables: Vec<VariableDecl>,
    variable_ids: HashMap<EcoString, VariableId>,
    passage_ids: HashMap<EcoString, PassageId>,
    next_element: u32,
    map: SourceMap,
}

impl Generator {
    fn new(script: &Script, analysis: &Analysis) -> Self {
        let mut variables = Vec::new();
        let mut variable_ids = HashMap::new();
        for (_, symbol) in analysis.symbols.iter() {
            if symbol.kind == SymbolKind::Variable {
                let id = VariableId(u32::try_from(variables.len()).unwrap_or(u32::MAX));
                variable_ids.insert(symbol.name.clone(), id);
                variables.push(VariableDecl {
                    name: symbol.name.clone(),
                    ty: VarType::Unknown,
                    default: None,
                });
            }
        }

        let mut passage_ids = HashMap::new();
        let mut next = 0u32;
        for passage in &script.passages {
            if !passage_ids.contains_key(&passage.name.name) {
                passage_ids.insert(passage.name.name.clone(), PassageId(next));
                next += 1;
            }
        }

        Self {
            variables,
            variable_ids,
            passage_ids,
            next_element: 0,
            map: SourceMap::new(),
        }
    }

    /// Allocates the next element id and records its origin.
    fn fresh(&mut self, span: Span, symbol: Option<EcoString>) -> ElementId {
        let id = ElementId(self.next_element);
        self.next_element += 1;
        self.map.record(id, span, symbol);
        id
    }

    fn emit_statements(&mut self, statements: &[Statement]) -> Vec<Element> {
        let mut elements = Vec::new();
        for statement in statements {
            if let Some(element) = self.emit_statement(statement) {
                elements.push(element);
            }
        }
        elements
    }

    fn emit_statement(&mut self, statement: &Statement) -> Option<Element> {
        match statement {
            Statement::Text { segments, span } => {
                let id = self.fresh(*span, None);
                let parts = self.lower_segments(segments);
                Some(Element {
                    id,
                    kind: ElementKind::Line { parts },
                })
            }
            Statement::Choice(choice) => self.emit_choice(choice),
            Statement::Assignment(assignment) => self.emit_assignment(assignment),
            Statement::Conditional(conditional) => self.emit_conditional(conditional),
            Statement::Divert(divert) => {
                let id = self.fresh(divert.span, Some(divert.target.name.clone()));
                let target = self.lower_divert(divert)?;
                Some(Element {
                    id,
                    kind: ElementKind::Divert { target },
                })
            }
            Statement::Tunnel(divert) => {
                let id = self.fresh(divert.span, Some(divert.target.name.clone()));
                let target = self.lower_divert(divert)?;
                Some(Element {
                    id,
                    kind: ElementKind::Tunnel { target },
                })
            }
            Statement::Thread(divert) => {
                let id = self.fresh(divert.span, Some(divert.target.name.clone()));
                let target = self.lower_divert(divert)?;
                Some(Element {
                    id,
                    kind: ElementKind::Thread { target },
                })
            }
            Statement::TunnelReturn { span } => {
                let id = self.fresh(*span, None);
                Some(Element {
                    id,
                    kind: ElementKind::TunnelReturn,
                })
            }
            // Unreachable when diagnostics are clean.
            Statement::Error { .. } => None,
        }
    }

    fn emit_choice(&mut self, choice: &Choice) -> Option<Element> {
        let symbol = choice.target.as_ref().map(|d| d.target.name.clone());
        let id = self.fresh(choice.span, symbol);
        let condition = choice.condition.as_ref().map(|e| self.lower_expr(e));
        let parts = self.lower_segments(&choice.text);
        let target = choice
            .target
            .as_ref()
            .and_then(|divert| self.lower_divert(divert));
        let body = self.emit_statements(&choice.body);
        Some(Element {
            id,
            kind: ElementKind::Choice {
                sticky: choice.sticky,
                condition,
                parts,
                target,
                body,
            },
        })
    }

    fn emit_assignment(&mut self, assignment: &Assignment) -> Option<Element> {
        let var = *self.variable_ids.get(&assignment.target.name)?;
        let id = self.fresh(assignment.span, Some(assignment.target.name.clone()));
        let rhs = self.lower_expr(&assignment.value);

        let kind = match &assignment.target.index {
            None => {
                // Compound assignment reads the old value.
                let value = match assignment.op.binary_op() {
                    Some(op) => ExprIr::Binary {
                        op: op.into(),
                        left: Box::new(ExprIr::Var { var }),
                        right: Box::new(rhs),
                    },
                    None => {
                        self.infer_declaration(var, &rhs);
                        rhs
                    }
                };
                ElementKind::Set { var, value }
            }
            Some(IndexKind::Append) => ElementKind::Append { var, value: rhs },
            Some(IndexKind::Expr(index)) => {
                let index = self.lower_expr(index);
                let value = match assignment.op.binary_op() {
                    Some(op) => ExprIr::Binary {
                        op: op.into(),
                        left: Box::new(ExprIr::Index {
                            var,
                            index: Box::new(index.clone()),
                        }),
                        right: Box::new(rhs),
                    },
                    None => rhs,
                };
                ElementKind::SetIndex { var, index, value }
            }
        };
        Some(Element { id, kind })
    }

    fn emit_conditional(&mut self, conditional: &Conditional) -> Option<Element> {
        let id = self.fresh(conditional.span, None);
        let arms = conditional
            .branches
            .iter()
            .map(|branch| BranchArm {
                condition: self.lower_expr(&branch.condition),
                elements: self.emit_statements(&branch.body),
            })
            .collect();
        let else_arm = conditional
            .else_body
            .as_deref()
            .map(|body| self.emit_statements(body))
            .unwrap_or_default();
        Some(Element {
            id,
            kind: ElementKind::Branch { arms, else_arm },
        })
    }

    /// Fills in a variable's declaration-table entry from the first
    /// plain assignment it receives.
    fn infer_declaration(&mut self, var: VariableId, value: &ExprIr) {
        let Some(decl) = self.variables.get_mut(var.0 as usize) else {
            return;
        };
        if decl.ty != VarType::Unknown {
            return;
        }
        decl.ty = match value {
            ExprIr::Literal(ValueIr::Int(_)) => VarType::Int,
            ExprIr::Literal(ValueIr::Float(_)) => VarType::Float,
            ExprIr::Literal(ValueIr::Str(_)) => VarType::Str,
            ExprIr::Literal(ValueIr::Bool(_)) => VarType::Bool,
            ExprIr::List(_) => VarType::List,
            _ => return,
        };
        if is_constant(value) {
            decl.default = Some(value.clone());
        }
    }

    fn lower_divert(&mut self, divert: &Divert) -> Option<DivertIr> {
        let passage = *self.passage_ids.get(&divert.target.name)?;
        let args = divert.args.iter().map(|arg| self.lower_expr(arg)).collect();
        Some(DivertIr { passage, args })
    }

    fn lower_segments(&mut self, segments: &[TextSegment]) -> Vec<Part> {
        segments
            .iter()
            .map(|segment| match segment {
                TextSegment::Text { text, .. } => Part::Text(text.clone()),
                TextSegment::Interpolation(expr) => Part::Expr(self.lower_expr(expr)),
                TextSegment::Conditional(inline) => Part::Cond {
                    condition: self.lower_expr(&inline.condition),
                    then_parts: self.lower_segments(&inline.then_segments),
                    else_parts: inline
                        .else_segments
                        .as_deref()
                        .map(|segments| self.lower_segments(segments))
                        .unwrap_or_default(),
                },
            })
            .collect()
    }

    fn lower_expr(&mut self, expr: &Expr) -> ExprIr {
        match expr {
            Expr::Binary {
                op, left, right, ..
            } => ExprIr::Binary {
                op: (*op).into(),
                left: Box::new(self.lower_expr(left)),
                right: Box::new(self.lower_expr(right)),
            },
            Expr::Unary { op, operand, .. } => ExprIr::Unary {
                op: (*op).into(),
                operand: Box::new(self.lower_expr(operand)),
            },
            Expr::Variable(variable) => match self.variable_ids.get(&variable.name) {
                Some(&var) => match &variable.index {
                    Some(index) => ExprIr::Index {
                        var,
                        index: Box::new(self.lower_expr(index)),
                    },
                    None => ExprIr::Var { var },
                },
                // Unreachable when analysis ran over this tree.
                None => ExprIr::Literal(ValueIr::Bool(false)),
            },
            Expr::Call { name, args, .. } => ExprIr::Call {
                function: name.name.clone(),
                args: args.iter().map(|arg| self.lower_expr(arg)).collect(),
            },
            Expr::Literal(literal) => ExprIr::Literal(match &literal.kind {
                LiteralKind::Int(value) => ValueIr::Int(*value),
                LiteralKind::Float(value) => ValueIr::Float(*value),
                LiteralKind::Str(value) => ValueIr::Str(value.clone()),
                LiteralKind::Bool(value) => ValueIr::Bool(*value),
            }),
            Expr::List { elements, .. } => ExprIr::List(
                elements
                    .iter()
                    .map(|element| self.lower_expr(element))
                    .collect(),
            ),
            // Unreachable when diagnostics are clean.
            Expr::Error { .. } => ExprIr::Literal(ValueIr::Bool(false)),
        }
    }
}

fn is_constant(expr: &ExprIr) -> bool {
    match expr {
        ExprIr::Literal(_) => true,
        ExprIr::List(elements) => elements.iter().all(is_constant),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic_analysis::analyze;
    use crate::source_analysis::parse;

    fn compile(source: &str) -> (Story, SourceMap) {
        let (mut script, diagnostics) = parse(source);
        assert!(diagnostics.is_empty(), "parse: {diagnostics:?}");
        let analysis = analyze(&mut script, None);
        assert!(
            !has_errors(&analysis.diagnostics),
            "analysis: {:?}",
            analysis.diagnostics
        );
        generate(&script, &analysis, &diagnostics).expect("generation succeeds")
    }

    #[test]
    fn two_passage_story_resolves_divert() {
        let (story, map) = compile(":: Start\nHello.\n-> End\n\n:: End\nBye.\n");
        assert_eq!(story.passages.len(), 2);
        assert_eq!(story.start, PassageId(0));

        let ElementKind::Divert { target } = &story.passages[0].elements[1].kind else {
            panic!("expected divert element");
        };
        assert_eq!(target.passage, story.passage_id("End").unwrap());

        // Every element has a mapping back to source.
        let total = story
            .passages
            .iter()
            .map(|p| p.elements.len())
            .sum::<usize>();
        assert!(map.len() >= total);
    }

    #[test]
    fn compound_assignment_lowers_to_read_modify_write() {
        let (story, _) = compile(":: S\n~ $gold = 1\n~ $gold += 10\nTotal { $gold }.\n");
        let ElementKind::Set { var, value } = &story.passages[0].elements[1].kind else {
            panic!("expected set element");
        };
        let ExprIr::Binary { op, left, right } = value else {
            panic!("expected lowered binary, got {value:?}");
        };
        assert_eq!(*op, BinOp::Add);
        assert_eq!(**left, ExprIr::Var { var: *var });
        assert_eq!(**right, ExprIr::Literal(ValueIr::Int(10)));
    }

    #[test]
    fn append_lowers_to_append_element() {
        let (story, _) = compile(":: S\n~ $bag = []\n~ $bag[] = \"rope\"\nGot { $bag }.\n");
        assert!(matches!(
            story.passages[0].elements[1].kind,
            ElementKind::Append { .. }
        ));
    }

    #[test]
    fn indexed_compound_assignment_reads_the_element() {
        let (story, _) = compile(":: S\n~ $bag = [1]\n~ $bag[0] += 2\nGot { $bag }.\n");
        let ElementKind::SetIndex { value, .. } = &story.passages[0].elements[1].kind else {
            panic!("expected set-index element");
        };
        let ExprIr::Binary { left, .. } = value else {
            panic!("expected lowered binary");
        };
        assert!(matches!(**left, ExprIr::Index { .. }));
    }

    #[test]
    fn choice_lowering_keeps_structure() {
        let source =
            ":: S\n+ {$brave} [Enter] -> Cave\n    Deep breath.\n\n:: Cave\nDark.\n~ $brave = true\n";
        let (story, _) = compile(source);
        let ElementKind::Choice {
            sticky,
            condition,
            parts,
            target,
            body,
        } = &story.passages[0].elements[0].kind
        else {
            panic!("expected choice element");
        };
        assert!(*sticky);
        assert!(condition.is_some());
        assert_eq!(parts.len(), 1);
        assert_eq!(
            target.as_ref().unwrap().passage,
            story.passage_id("Cave").unwrap()
        );
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn branch_lowering_with_else() {
        let source = ":: S\n~ $g = 1\n{ $g > 0:\nRich.\n- else:\nPoor.\n}\n";
        let (story, _) = compile(source);
        let ElementKind::Branch { arms, else_arm } = &story.passages[0].elements[1].kind else {
            panic!("expected branch element");
        };
        assert_eq!(arms.len(), 1);
        assert_eq!(else_arm.len(), 1);
    }

    #[test]
    fn variables_collected_in_declaration_order() {
        let (story, _) = compile(":: S\n~ $b = 1\n~ $a = 2\nSum { $b + $a }.\n");
        let names: Vec<&str> = story.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn variable_table_infers_types_and_defaults() {
        let source = ":: S\n\
                      ~ $gold = 10\n\
                      ~ $name = \"Kim\"\n\
                      ~ $bag = [1, 2]\n\
                      ~ $luck = random(1, 6)\n\
                      Have { $gold } { $name } { $bag } { $luck }\n";
        let (story, _) = compile(source);
        let decl = |name: &str| {
            story
                .variables
                .iter()
                .find(|v| v.name == name)
                .unwrap_or_else(|| panic!("no declaration for {name}"))
        };

        assert_eq!(decl("gold").ty, VarType::Int);
        assert_eq!(
            decl("gold").default,
            Some(ExprIr::Literal(ValueIr::Int(10)))
        );
        assert_eq!(decl("name").ty, VarType::Str);
        assert_eq!(decl("bag").ty, VarType::List);
        assert!(decl("bag").default.is_some());
        // A call is not a literal: no inferred type, no default.
        assert_eq!(decl("luck").ty, VarType::Unknown);
        assert_eq!(decl("luck").default, None);
    }

    #[test]
    fn metadata_last_value_wins() {
        let source = "@@ title: One\n@@ author: Me\n@@ title: Two\n:: S\nX.\n";
        let (story, _) = compile(source);
        assert_eq!(
            story.metadata,
            vec![
                ("title".into(), "Two".into()),
                ("author".into(), "Me".into()),
            ]
        );
    }

    #[test]
    fn source_map_carries_symbols() {
        let (story, map) = compile(":: S\n~ $gold = 1\nCoins { $gold }.\n");
        let set_id = story.passages[0].elements[0].id;
        assert_eq!(
            map.mapping(set_id).unwrap().symbol.as_deref(),
            Some("gold")
        );
    }

    #[test]
    fn generation_refuses_scripts_with_errors() {
        let (mut script, diagnostics) = parse(":: S\n~ = broken\n");
        let analysis = analyze(&mut script, None);
        assert_eq!(
            generate(&script, &analysis, &diagnostics),
            Err(CodegenError::HasErrors)
        );
    }

    #[test]
    fn generation_refuses_empty_scripts() {
        let (mut script, diagnostics) = parse("@@ title: Empty\n");
        let analysis = analyze(&mut script, None);
        assert_eq!(
            generate(&script, &analysis, &diagnostics),
            Err(CodegenError::NoPassages)
        );
    }

    #[test]
    fn warnings_do_not_block_generation() {
        // Unused variable is a warning, not an error.
        let (mut script, diagnostics) = parse(":: S\n~ $unused = 1\nText.\n");
        let analysis = analyze(&mut script, None);
        assert!(!analysis.diagnostics.is_empty());
        assert!(generate(&script, &analysis, &diagnostics).is_ok());
    }
}
