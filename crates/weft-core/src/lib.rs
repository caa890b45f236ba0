// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Weft compiler core.
//!
//! This crate contains the core compiler functionality:
//! - Lexical analysis (indentation-aware tokenization)
//! - Parsing (AST construction with error recovery)
//! - Semantic analysis (name resolution, reachability, usage audits)
//! - Code generation (the serializable story representation)
//!
//! The compiler never stops at the first problem: every phase
//! accumulates diagnostics and recovers, so one pass over a script
//! reports everything wrong with it. A story is only produced when no
//! error-severity diagnostic was recorded.
//!
//! [`compile::compile`] runs the whole pipeline; the phase modules are
//! public for tooling that wants to stop partway (an editor checking a
//! buffer wants diagnostics, not a story).

pub mod ast;
pub mod codegen;
pub mod compile;
pub mod diagnostics;
pub mod semantic_analysis;
pub mod source_analysis;
pub mod visit;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::ast::{Expr, Passage, Script, Statement};
    pub use crate::codegen::{SourceMap, Story};
    pub use crate::compile::{compile, CompileOptions, CompileResult, Compiler};
    pub use crate::diagnostics::{Diagnostic, Severity};
    pub use crate::source_analysis::Span;
}
