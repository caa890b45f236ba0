// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Name resolution and semantic checks.
//!
//! Analysis runs in three passes over the AST:
//!
//! 1. **Declare** — collect every passage into the symbol table,
//!    reporting duplicates at their second declaration.
//! 2. **Annotate** — a [`MutVisitor`] walk resolves every divert target,
//!    variable, and function call in place, filling the AST's `resolved`
//!    fields and reporting undefined names with "did you mean"
//!    suggestions.
//! 3. **Audit** — whole-program checks that need the annotated tree:
//!    start-passage resolution, unreachable passages, unused variables.
//!
//! Analysis never stops early; it accumulates diagnostics so the caller
//! can show everything wrong with a script at once.

use std::collections::HashSet;

use ecow::EcoString;

use crate::ast::{AssignOp, AssignTarget, Divert, Expr, IndexKind, Passage, Script, Statement};
use crate::diagnostics::{codes, Diagnostic};
use crate::source_analysis::Span;
use crate::visit::{self, MutVisitor, Visitor};

use super::string_utils::did_you_mean;
use super::symbol_table::{ScopeKind, ScopeStack, SymbolId, SymbolKind, SymbolTable};

/// The result of semantic analysis.
#[derive(Debug)]
pub struct Analysis {
    pub symbols: SymbolTable,
    /// The resolved start passage, when one exists.
    pub start: Option<SymbolId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Analyzes a script, annotating name references in place.
///
/// `start_override` takes precedence over the script's `@@ start:`
/// metadata, which in turn beats the default of the first passage.
#[must_use]
pub fn analyze(script: &mut Script, start_override: Option<&str>) -> Analysis {
    let mut symbols = SymbolTable::new();
    let mut diagnostics = Vec::new();

    // Pass 1: declare passages.
    for passage in &script.passages {
        if let Err(existing) = symbols.declare_passage(&passage.name.name, passage.name.span) {
            let first = symbols.get(existing).declaration_span;
            diagnostics.push(
                Diagnostic::error(
                    codes::DUPLICATE_PASSAGE,
                    format!("passage `{}` is declared twice", passage.name.name),
                    passage.name.span,
                )
                .with_suggestion(format!(
                    "the first declaration is at byte offset {}; rename one of them",
                    first.start()
                )),
            );
        }
    }

    // Statements in the preamble are legal only as error placeholders.
    for statement in &script.preamble {
        match statement {
            Statement::TunnelReturn { span } => diagnostics.push(Diagnostic::error(
                codes::MISPLACED_TUNNEL_RETURN,
                "`->->` return outside of any passage",
                *span,
            )),
            Statement::Error { .. } => {}
            other => diagnostics.push(Diagnostic::error(
                codes::CONTENT_OUTSIDE_PASSAGE,
                "content before the first passage header",
                other.span(),
            )),
        }
    }

    // Pass 2: annotate references.
    let mut resolver = Resolver {
        symbols: &mut symbols,
        diagnostics: &mut diagnostics,
        scopes: ScopeStack::new(),
        defined: HashSet::new(),
        maybe_defined: HashSet::new(),
    };
    resolver.visit_script(script);

    // Pass 3: whole-program audits.
    let start = resolve_start(script, &mut symbols, &mut diagnostics, start_override);
    check_reachability(script, &symbols, start, &mut diagnostics);
    check_unused_variables(&symbols, &mut diagnostics);

    Analysis {
        symbols,
        start,
        diagnostics,
    }
}

// ============================================================================
// Pass 2: annotation
// ============================================================================

struct Resolver<'a> {
    symbols: &'a mut SymbolTable,
    diagnostics: &'a mut Vec<Diagnostic>,
    scopes: ScopeStack,
    /// Variables written on every path reaching the current statement.
    defined: HashSet<EcoString>,
    /// Variables written somewhere, possibly behind a condition.
    maybe_defined: HashSet<EcoString>,
}

impl Resolver<'_> {
    fn resolve_divert(&mut self, divert: &mut Divert) {
        match self.symbols.passage(&divert.target.name) {
            Some(id) => {
                divert.resolved = Some(id);
                self.symbols.record_reference(id, divert.target.span);
            }
            None => {
                let mut diagnostic = Diagnostic::error(
                    codes::UNDEFINED_PASSAGE,
                    format!("no passage named `{}`", divert.target.name),
                    divert.target.span,
                );
                if let Some(close) =
                    did_you_mean(&divert.target.name, self.symbols.passage_names())
                {
                    diagnostic = diagnostic.with_suggestion(format!("did you mean `{close}`?"));
                }
                self.diagnostics.push(diagnostic);
            }
        }
    }

    /// Records a variable read, warning when nothing has written it yet.
    fn resolve_read(&mut self, name: &EcoString, span: Span) -> Option<SymbolId> {
        if !self.defined.contains(name) && !self.maybe_defined.contains(name) {
            self.diagnostics.push(Diagnostic::warning(
                codes::READ_BEFORE_WRITE,
                format!("variable `${name}` is read before any value is assigned to it"),
                span,
            ));
            // Declare it so the warning fires once per variable.
            self.maybe_defined.insert(name.clone());
        }
        let id = self.symbols.declare_variable(name, span);
        self.symbols.record_reference(id, span);
        self.symbols.get_mut(id).is_read = true;
        Some(id)
    }

    /// Records a variable write.
    fn resolve_write(&mut self, target: &mut AssignTarget) {
        let id = self.symbols.declare_variable(&target.name, target.span);
        target.resolved = Some(id);
        self.symbols.record_reference(id, target.span);
        self.symbols.get_mut(id).is_written = true;
        if self.scopes.is_unconditional() {
            self.defined.insert(target.name.clone());
        }
        self.maybe_defined.insert(target.name.clone());
    }
}

impl MutVisitor for Resolver<'_> {
    fn visit_passage(&mut self, passage: &mut Passage) {
        self.scopes.enter(ScopeKind::Passage);
        visit::walk_passage_mut(self, passage);
        self.scopes.exit();
    }

    fn visit_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Choice(choice) => {
                if let Some(condition) = &mut choice.condition {
                    self.visit_expr(condition);
                }
                for segment in &mut choice.text {
                    self.visit_segment(segment);
                }
                if let Some(target) = &mut choice.target {
                    self.visit_divert(target);
                }
                self.scopes.enter(ScopeKind::Choice);
                for statement in &mut choice.body {
                    self.visit_statement(statement);
                }
                self.scopes.exit();
            }
            Statement::Conditional(conditional) => {
                for branch in &mut conditional.branches {
                    self.visit_expr(&mut branch.condition);
                    self.scopes.enter(ScopeKind::Conditional);
                    for statement in &mut branch.body {
                        self.visit_statement(statement);
                    }
                    self.scopes.exit();
                }
                if let Some(body) = &mut conditional.else_body {
                    self.scopes.enter(ScopeKind::Conditional);
                    for statement in body {
                        self.visit_statement(statement);
                    }
                    self.scopes.exit();
                }
            }
            Statement::Assignment(assignment) => {
                // Reads happen before the write lands.
                if let Some(IndexKind::Expr(index)) = &mut assignment.target.index {
                    self.visit_expr(index);
                }
                self.visit_expr(&mut assignment.value);
                // Compound and element assignments read the variable too;
                // warn if nothing could have initialized it.
                let reads_target = assignment.op != AssignOp::Set
                    || assignment.target.index.is_some();
                if reads_target
                    && !self.defined.contains(&assignment.target.name)
                    && !self.maybe_defined.contains(&assignment.target.name)
                {
                    self.diagnostics.push(Diagnostic::warning(
                        codes::READ_BEFORE_WRITE,
                        format!(
                            "variable `${}` is modified before any value is assigned to it",
                            assignment.target.name
                        ),
                        assignment.target.span,
                    ));
                }
                self.resolve_write(&mut assignment.target);
            }
            _ => visit::walk_statement_mut(self, statement),
        }
    }

    fn visit_divert(&mut self, divert: &mut Divert) {
        self.resolve_divert(divert);
        visit::walk_divert_mut(self, divert);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Variable(variable) => {
                variable.resolved = self.resolve_read(&variable.name.clone(), variable.span);
                if let Some(index) = &mut variable.index {
                    self.visit_expr(index);
                }
            }
            Expr::Call { name, args, .. } => {
                match self.symbols.function(&name.name) {
                    Some(id) => {
                        let SymbolKind::Function { arity } = self.symbols.get(id).kind else {
                            unreachable!("function table holds only functions");
                        };
                        if args.len() != usize::from(arity) {
                            self.diagnostics.push(Diagnostic::error(
                                codes::WRONG_ARGUMENT_COUNT,
                                format!(
                                    "`{}` takes {} argument{}, found {}",
                                    name.name,
                                    arity,
                                    if arity == 1 { "" } else { "s" },
                                    args.len()
                                ),
                                name.span,
                            ));
                        }
                        self.symbols.record_reference(id, name.span);
                    }
                    None => {
                        let mut diagnostic = Diagnostic::error(
                            codes::UNKNOWN_FUNCTION,
                            format!("no function named `{}`", name.name),
                            name.span,
                        );
                        if let Some(close) =
                            did_you_mean(&name.name, self.symbols.function_names())
                        {
                            diagnostic =
                                diagnostic.with_suggestion(format!("did you mean `{close}`?"));
                        }
                        self.diagnostics.push(diagnostic);
                    }
                }
                for arg in args {
                    self.visit_expr(arg);
                }
            }
            _ => visit::walk_expr_mut(self, expr),
        }
    }
}

// ============================================================================
// Pass 3: audits
// ============================================================================

/// Resolves the start passage: explicit override, then `@@ start:`
/// metadata, then the first passage in the file.
fn resolve_start(
    script: &Script,
    symbols: &mut SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
    start_override: Option<&str>,
) -> Option<SymbolId> {
    let named = start_override
        .map(|name| (EcoString::from(name), Span::default()))
        .or_else(|| {
            script.metadata.iter().rev().find_map(|m| {
                (m.key.name == "start").then(|| (m.value.clone(), m.span))
            })
        });

    match named {
        Some((name, span)) => match symbols.passage(&name) {
            Some(id) => {
                symbols.record_reference(id, span);
                Some(id)
            }
            None => {
                let mut diagnostic = Diagnostic::error(
                    codes::UNKNOWN_START_PASSAGE,
                    format!("start passage `{name}` does not exist"),
                    span,
                );
                if let Some(close) = did_you_mean(&name, symbols.passage_names()) {
                    diagnostic = diagnostic.with_suggestion(format!("did you mean `{close}`?"));
                }
                diagnostics.push(diagnostic);
                None
            }
        },
        None => script
            .passages
            .first()
            .and_then(|p| symbols.passage(&p.name.name)),
    }
}

/// Flags passages that no divert, tunnel, thread, or choice target
/// names and that are not the start passage.
///
/// The rule is local: any inbound edge keeps a passage alive, even one
/// from a passage that is itself never targeted.
fn check_reachability(
    script: &Script,
    symbols: &SymbolTable,
    start: Option<SymbolId>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(start) = start else {
        return;
    };

    let mut collector = TargetCollector {
        targets: HashSet::new(),
    };
    collector.visit_script(script);

    for passage in &script.passages {
        let Some(id) = symbols.passage(&passage.name.name) else {
            continue;
        };
        // Duplicates map to the first declaration; only report it once.
        if symbols.get(id).declaration_span != passage.name.span {
            continue;
        }
        if id != start && !collector.targets.contains(&id) {
            diagnostics.push(Diagnostic::warning(
                codes::UNREACHABLE_PASSAGE,
                format!(
                    "passage `{}` is unreachable: nothing links to it",
                    passage.name.name
                ),
                passage.name.span,
            ));
        }
    }
}

/// Collects every passage some resolved divert, tunnel, thread, or
/// choice targets.
struct TargetCollector {
    targets: HashSet<SymbolId>,
}

impl Visitor for TargetCollector {
    fn visit_divert(&mut self, divert: &Divert) {
        if let Some(id) = divert.resolved {
            self.targets.insert(id);
        }
        visit::walk_divert(self, divert);
    }
}

fn check_unused_variables(symbols: &SymbolTable, diagnostics: &mut Vec<Diagnostic>) {
    for (_, symbol) in symbols.iter() {
        if symbol.kind == SymbolKind::Variable && symbol.is_written && !symbol.is_read {
            diagnostics.push(Diagnostic::warning(
                codes::UNUSED_VARIABLE,
                format!("variable `${}` is never read", symbol.name),
                symbol.declaration_span,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_analysis::parse;

    fn analyze_source(source: &str) -> Analysis {
        let (mut script, diagnostics) = parse(source);
        assert!(diagnostics.is_empty(), "parse errors: {diagnostics:?}");
        analyze(&mut script, None)
    }

    fn codes_of(analysis: &Analysis) -> Vec<&'static str> {
        analysis.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn clean_story_has_no_diagnostics() {
        let analysis = analyze_source(
            ":: Start\n~ $gold = 10\nYou have { $gold } coins.\n-> End\n\n:: End\nBye.\n",
        );
        assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
        assert!(analysis.start.is_some());
    }

    #[test]
    fn undefined_passage_suggests_near_miss() {
        let analysis = analyze_source(":: Start\n-> Celler\n\n:: Cellar\nDark.\n");
        let diagnostic = analysis
            .diagnostics
            .iter()
            .find(|d| d.code == codes::UNDEFINED_PASSAGE)
            .expect("undefined passage");
        assert!(diagnostic
            .suggestion
            .as_ref()
            .unwrap()
            .contains("Cellar"));
    }

    #[test]
    fn duplicate_passage_reported_at_second_declaration() {
        let analysis = analyze_source(":: Start\nA.\n\n:: Start\nB.\n");
        let diagnostic = analysis
            .diagnostics
            .iter()
            .find(|d| d.code == codes::DUPLICATE_PASSAGE)
            .expect("duplicate passage");
        // Second header is past the first one in the file.
        assert!(diagnostic.span.start() > 10);
    }

    #[test]
    fn unknown_function_suggests_builtin() {
        let analysis = analyze_source(":: S\n~ $n = randm(1, 6)\n");
        let diagnostic = analysis
            .diagnostics
            .iter()
            .find(|d| d.code == codes::UNKNOWN_FUNCTION)
            .expect("unknown function");
        assert!(diagnostic.suggestion.as_ref().unwrap().contains("random"));
    }

    #[test]
    fn wrong_arity_reported() {
        let analysis = analyze_source(":: S\n~ $n = random(1)\n");
        assert!(codes_of(&analysis).contains(&codes::WRONG_ARGUMENT_COUNT));
    }

    #[test]
    fn read_before_write_warns_once() {
        let analysis = analyze_source(":: S\nYou have { $gold } and { $gold } coins.\n");
        let count = analysis
            .diagnostics
            .iter()
            .filter(|d| d.code == codes::READ_BEFORE_WRITE)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn conditional_write_suppresses_read_warning() {
        let source = ":: S\n{ true:\n~ $found = 1\n}\nValue { $found }.\n";
        let analysis = analyze_source(source);
        assert!(!codes_of(&analysis).contains(&codes::READ_BEFORE_WRITE));
    }

    #[test]
    fn compound_assign_of_uninitialized_warns() {
        let analysis = analyze_source(":: S\n~ $gold += 1\nTotal { $gold }.\n");
        assert!(codes_of(&analysis).contains(&codes::READ_BEFORE_WRITE));
    }

    #[test]
    fn unused_variable_warns() {
        let analysis = analyze_source(":: S\n~ $secret = 42\nNothing here.\n");
        assert!(codes_of(&analysis).contains(&codes::UNUSED_VARIABLE));
    }

    #[test]
    fn unreachable_passage_warns() {
        let analysis = analyze_source(":: Start\n-> End\n\n:: End\nBye.\n\n:: Lost\nNever.\n");
        let diagnostic = analysis
            .diagnostics
            .iter()
            .find(|d| d.code == codes::UNREACHABLE_PASSAGE)
            .expect("unreachable passage");
        assert!(diagnostic.message.contains("Lost"));
    }

    #[test]
    fn mutually_linked_passages_keep_each_other_alive() {
        // A and B only point at each other, but each has an inbound
        // link, so neither warns.
        let analysis =
            analyze_source(":: Start\nDone.\n\n:: A\n-> B\n\n:: B\n-> A\n");
        assert!(!codes_of(&analysis).contains(&codes::UNREACHABLE_PASSAGE));
    }

    #[test]
    fn choice_targets_count_as_edges() {
        let analysis =
            analyze_source(":: Start\n+ [Go] -> There\n\n:: There\nMade it.\n");
        assert!(!codes_of(&analysis).contains(&codes::UNREACHABLE_PASSAGE));
    }

    #[test]
    fn start_metadata_selects_start_passage() {
        let source = "@@ start: Intro\n:: Other\nX.\n\n:: Intro\n-> Other\n";
        let analysis = analyze_source(source);
        let start = analysis.start.expect("start passage");
        assert_eq!(analysis.symbols.get(start).name, "Intro");
        assert!(!codes_of(&analysis).contains(&codes::UNREACHABLE_PASSAGE));
    }

    #[test]
    fn unknown_start_passage_reports() {
        let analysis = analyze_source("@@ start: Intro\n:: Start\nX.\n");
        assert!(codes_of(&analysis).contains(&codes::UNKNOWN_START_PASSAGE));
    }

    #[test]
    fn start_override_beats_metadata() {
        let (mut script, _) = parse("@@ start: A\n:: A\nX.\n\n:: B\nY.\n");
        let analysis = analyze(&mut script, Some("B"));
        assert_eq!(
            analysis.symbols.get(analysis.start.unwrap()).name,
            "B"
        );
    }

    #[test]
    fn tunnel_return_outside_passage_is_an_error() {
        let (mut script, _) = parse("->->\n:: S\nX.\n");
        let analysis = analyze(&mut script, None);
        assert!(analysis
            .diagnostics
            .iter()
            .any(|d| d.code == codes::MISPLACED_TUNNEL_RETURN));
    }

    #[test]
    fn content_outside_passage_is_an_error() {
        let (mut script, _) = parse("hello world\n:: S\nX.\n");
        let analysis = analyze(&mut script, None);
        assert!(analysis
            .diagnostics
            .iter()
            .any(|d| d.code == codes::CONTENT_OUTSIDE_PASSAGE));
    }

    #[test]
    fn tunnel_return_inside_passage_is_fine() {
        let analysis = analyze_source(":: Start\n->-> Shop\n->->\n\n:: Shop\nWares.\n->->\n");
        assert!(!codes_of(&analysis).contains(&codes::MISPLACED_TUNNEL_RETURN));
    }

    #[test]
    fn divert_annotations_are_filled_in() {
        let (mut script, _) = parse(":: Start\n-> End\n\n:: End\nBye.\n");
        let analysis = analyze(&mut script, None);
        let Statement::Divert(divert) = &script.passages[0].body[0] else {
            panic!("expected divert");
        };
        let id = divert.resolved.expect("resolved target");
        assert_eq!(analysis.symbols.get(id).name, "End");
    }
}
