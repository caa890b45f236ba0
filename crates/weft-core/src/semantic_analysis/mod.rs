// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Semantic analysis: name resolution and whole-program checks.
//!
//! [`analyze`] takes the parsed AST, resolves every passage, variable,
//! and function reference against a [`SymbolTable`], and audits the
//! annotated program for unreachable passages and unused variables.

mod resolver;
mod string_utils;
mod symbol_table;

pub use resolver::{analyze, Analysis};
pub use string_utils::{did_you_mean, edit_distance};
pub use symbol_table::{
    ScopeKind, ScopeStack, Symbol, SymbolId, SymbolKind, SymbolTable, BUILTINS,
};
