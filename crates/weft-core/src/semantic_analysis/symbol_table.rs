// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Symbol table and lexical scope tracking.
//!
//! All declared names live in a single arena-style [`SymbolTable`]; AST
//! nodes are annotated with [`SymbolId`] indices into it. Passages and
//! variables occupy separate namespaces, and the built-in functions are
//! preloaded as [`SymbolKind::Function`] entries.

use std::collections::HashMap;

use ecow::EcoString;

use crate::source_analysis::Span;

/// An index into the [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Passage,
    Variable,
    /// A built-in function with a fixed arity.
    Function { arity: u8 },
}

/// A declared name and everything analysis has learned about it.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: EcoString,
    pub kind: SymbolKind,
    /// Where the name was declared. For variables this is the first
    /// write; for built-ins it is empty.
    pub declaration_span: Span,
    /// Every reference site, in source order.
    pub references: Vec<Span>,
    /// A variable that is read somewhere.
    pub is_read: bool,
    /// A variable that is written somewhere.
    pub is_written: bool,
}

/// The built-in functions available in expressions.
pub const BUILTINS: &[(&str, u8)] = &[
    ("random", 2),
    ("floor", 1),
    ("ceil", 1),
    ("round", 1),
    ("count", 1),
    ("min", 2),
    ("max", 2),
];

/// All symbols of a script, indexed by [`SymbolId`].
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    passages: HashMap<EcoString, SymbolId>,
    variables: HashMap<EcoString, SymbolId>,
    functions: HashMap<EcoString, SymbolId>,
}

impl SymbolTable {
    /// Creates a table preloaded with the built-in functions.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            symbols: Vec::new(),
            passages: HashMap::new(),
            variables: HashMap::new(),
            functions: HashMap::new(),
        };
        for &(name, arity) in BUILTINS {
            let id = table.push(Symbol {
                name: EcoString::from(name),
                kind: SymbolKind::Function { arity },
                declaration_span: Span::default(),
                references: Vec::new(),
                is_read: false,
                is_written: false,
            });
            table.functions.insert(EcoString::from(name), id);
        }
        table
    }

    fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(u32::try_from(self.symbols.len()).unwrap_or(u32::MAX));
        self.symbols.push(symbol);
        id
    }

    /// Declares a passage. Returns the existing id (a duplicate) when the
    /// name is already taken.
    pub fn declare_passage(&mut self, name: &EcoString, span: Span) -> Result<SymbolId, SymbolId> {
        if let Some(&existing) = self.passages.get(name) {
            return Err(existing);
        }
        let id = self.push(Symbol {
            name: name.clone(),
            kind: SymbolKind::Passage,
            declaration_span: span,
            references: Vec::new(),
            is_read: false,
            is_written: false,
        });
        self.passages.insert(name.clone(), id);
        Ok(id)
    }

    /// Declares a variable at its first write, or returns its id.
    pub fn declare_variable(&mut self, name: &EcoString, span: Span) -> SymbolId {
        if let Some(&existing) = self.variables.get(name) {
            return existing;
        }
        let id = self.push(Symbol {
            name: name.clone(),
            kind: SymbolKind::Variable,
            declaration_span: span,
            references: Vec::new(),
            is_read: false,
            is_written: false,
        });
        self.variables.insert(name.clone(), id);
        id
    }

    #[must_use]
    pub fn passage(&self, name: &str) -> Option<SymbolId> {
        self.passages.get(name).copied()
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<SymbolId> {
        self.variables.get(name).copied()
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<SymbolId> {
        self.functions.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Records a reference to a symbol.
    pub fn record_reference(&mut self, id: SymbolId, span: Span) {
        self.symbols[id.index()].references.push(span);
    }

    /// Iterates symbols with their ids, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(u32::try_from(i).unwrap_or(u32::MAX)), s))
    }

    /// Passage names in declaration order, for suggestion candidates.
    pub fn passage_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().filter_map(|s| {
            (s.kind == SymbolKind::Passage).then_some(s.name.as_str())
        })
    }

    /// Built-in function names, for suggestion candidates.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        BUILTINS.iter().map(|&(name, _)| name)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// What kind of block a scope level represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Passage,
    /// A choice's nested block; entered only when the choice is picked.
    Choice,
    /// A conditional branch; entered only when its guard holds.
    Conditional,
}

/// A stack of lexical scope levels.
///
/// Weft variables are story-global, so the stack does not hold
/// declarations; it tells analysis whether the current statement runs
/// unconditionally. A write at conditional depth does not count as a
/// definite assignment for read-before-write purposes.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    levels: Vec<ScopeKind>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            levels: vec![ScopeKind::Global],
        }
    }

    pub fn enter(&mut self, kind: ScopeKind) {
        self.levels.push(kind);
    }

    pub fn exit(&mut self) {
        debug_assert!(self.levels.len() > 1, "cannot exit the global scope");
        if self.levels.len() > 1 {
            self.levels.pop();
        }
    }

    #[must_use]
    pub fn current(&self) -> ScopeKind {
        *self.levels.last().unwrap_or(&ScopeKind::Global)
    }

    /// True when no enclosing level is conditional: a statement here
    /// always runs when its passage does.
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        !self
            .levels
            .iter()
            .any(|k| matches!(k, ScopeKind::Choice | ScopeKind::Conditional))
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_preloaded() {
        let table = SymbolTable::new();
        let id = table.function("random").expect("random is built in");
        assert_eq!(table.get(id).kind, SymbolKind::Function { arity: 2 });
        assert!(table.function("teleport").is_none());
    }

    #[test]
    fn duplicate_passage_returns_original() {
        let mut table = SymbolTable::new();
        let first = table
            .declare_passage(&EcoString::from("Start"), Span::new(0, 5))
            .unwrap();
        let err = table
            .declare_passage(&EcoString::from("Start"), Span::new(20, 25))
            .unwrap_err();
        assert_eq!(first, err);
        assert_eq!(table.get(first).declaration_span, Span::new(0, 5));
    }

    #[test]
    fn variables_declare_once() {
        let mut table = SymbolTable::new();
        let a = table.declare_variable(&EcoString::from("gold"), Span::new(0, 4));
        let b = table.declare_variable(&EcoString::from("gold"), Span::new(9, 13));
        assert_eq!(a, b);
    }

    #[test]
    fn references_accumulate() {
        let mut table = SymbolTable::new();
        let id = table.declare_variable(&EcoString::from("gold"), Span::new(0, 4));
        table.record_reference(id, Span::new(10, 14));
        table.record_reference(id, Span::new(20, 24));
        assert_eq!(table.get(id).references.len(), 2);
    }

    #[test]
    fn scope_stack_tracks_conditional_depth() {
        let mut scopes = ScopeStack::new();
        assert!(scopes.is_unconditional());
        scopes.enter(ScopeKind::Passage);
        assert!(scopes.is_unconditional());
        scopes.enter(ScopeKind::Conditional);
        assert!(!scopes.is_unconditional());
        scopes.exit();
        assert!(scopes.is_unconditional());
        assert_eq!(scopes.current(), ScopeKind::Passage);
    }
}
