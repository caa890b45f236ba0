// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the parser.
//!
//! Like the lexer, the parser is total: arbitrary input produces a
//! `Script` plus diagnostics, never a panic. Well-formed scripts built
//! from the grammar's productions parse without any diagnostics.

use proptest::prelude::*;

use super::parse;
use crate::ast::Statement;

fn identifier() -> impl Strategy<Value = String> {
    // Keywords lex as their own tokens, never as names.
    "[a-zA-Z][a-zA-Z0-9_]{0,8}".prop_filter("keyword", |s| {
        !matches!(s.as_str(), "and" | "or" | "not" | "else" | "true" | "false")
    })
}

fn text_line() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ,.!?']{0,30}".prop_map(|s| s.trim_end().to_string())
}

fn statement_line() -> impl Strategy<Value = String> {
    prop_oneof![
        text_line(),
        (identifier(), -100i64..100).prop_map(|(name, n)| format!("~ ${name} = {n}")),
        (identifier(), 1i64..100).prop_map(|(name, n)| format!("~ ${name} += {n}")),
        identifier().prop_map(|target| format!("-> {target}")),
        (text_line(), identifier()).prop_map(|(text, target)| format!("+ [{text}] -> {target}")),
        (identifier(), identifier())
            .prop_map(|(a, b)| format!("{{ ${a} > 0: yes| no }} said ${b} fans")),
    ]
}

fn passage() -> impl Strategy<Value = String> {
    (
        identifier(),
        proptest::collection::vec(statement_line(), 1..6),
    )
        .prop_map(|(name, lines)| format!(":: {name}\n{}\n", lines.join("\n")))
}

proptest! {
    #[test]
    fn parsing_never_panics(source in "\\PC*") {
        let (script, _) = parse(&source);
        // The script span is always well-formed.
        prop_assert!(script.span.start() <= script.span.end());
    }

    #[test]
    fn well_formed_scripts_parse_without_diagnostics(
        passages in proptest::collection::vec(passage(), 1..5)
    ) {
        let source = passages.join("\n");
        let (script, diagnostics) = parse(&source);
        prop_assert!(diagnostics.is_empty(), "{:?} in {:?}", diagnostics, source);
        prop_assert_eq!(script.passages.len(), passages.len());
    }

    #[test]
    fn every_statement_lands_in_a_passage_or_preamble(
        passages in proptest::collection::vec(passage(), 1..4)
    ) {
        let source = passages.join("\n");
        let (script, _) = parse(&source);
        for passage in &script.passages {
            for statement in &passage.body {
                prop_assert!(passage.span.contains(statement.span()));
            }
        }
    }

    #[test]
    fn parse_is_deterministic_over_garbage(source in "\\PC*") {
        let (first, first_diags) = parse(&source);
        let (second, second_diags) = parse(&source);
        prop_assert_eq!(first.passages.len(), second.passages.len());
        prop_assert_eq!(first_diags.len(), second_diags.len());
    }

    /// Error statements appear only alongside an error diagnostic.
    #[test]
    fn error_nodes_imply_error_diagnostics(source in "\\PC*") {
        let (script, diagnostics) = parse(&source);
        let has_error_node = script
            .passages
            .iter()
            .flat_map(|p| p.body.iter())
            .chain(script.preamble.iter())
            .any(|s| matches!(s, Statement::Error { .. }));
        if has_error_node {
            prop_assert!(diagnostics.iter().any(|d| d.is_error()));
        }
    }
}
