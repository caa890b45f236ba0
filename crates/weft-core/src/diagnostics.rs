// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Diagnostics: accumulation, codes, and rendering.
//!
//! Every phase of the pipeline appends [`Diagnostic`] records instead of
//! raising errors; the driving pipeline decides whether to proceed. Codes
//! are stable identifiers grouped by phase (see [`codes`]) so editor
//! tooling can categorize them without parsing messages.
//!
//! Rendering comes in three forms:
//!
//! - [`Reporter`] — plain-text caret/underline excerpts for terminals.
//! - [`ReportDiagnostic`] — a [`miette::Diagnostic`] wrapper for tooling
//!   that wants rich reports.
//! - [`DiagnosticSchema`] — the stable serde-serializable shape consumed
//!   by machines (line/column spans, optional suggestion).

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

use ecow::EcoString;
use serde::Serialize;

use crate::source_analysis::{SourceText, Span};

/// Stable diagnostic codes, grouped by the phase that emits them.
///
/// Lexer codes are `E00xx`, parser-structure `E01xx`, parser-expression
/// `E02xx`, semantic `E03xx`; warnings and hints from any phase are
/// `W04xx`. Codes are never reused or renumbered.
pub mod codes {
    // Lexer
    /// An unexpected character outside any recognized construct.
    pub const UNEXPECTED_CHARACTER: &str = "E0001";
    /// A string literal with no closing quote before end of line.
    pub const UNTERMINATED_STRING: &str = "E0002";
    /// An unknown escape sequence inside a string literal.
    pub const INVALID_ESCAPE: &str = "E0003";
    /// A `$` sigil with no variable name after it.
    pub const MISSING_VARIABLE_NAME: &str = "E0004";
    /// The shared lexer+parser error cap was reached and the run aborted.
    pub const TOO_MANY_ERRORS: &str = "E0005";

    // Parser (structure)
    /// A token that no statement form can begin with.
    pub const UNEXPECTED_TOKEN: &str = "E0101";
    /// A passage declaration with a missing or malformed name.
    pub const MALFORMED_PASSAGE: &str = "E0102";
    /// A choice missing its `[text]` part or closing bracket.
    pub const MALFORMED_CHOICE: &str = "E0103";
    /// An assignment with a malformed target or operator.
    pub const MALFORMED_ASSIGNMENT: &str = "E0104";
    /// A divert, tunnel, or thread with a missing target name.
    pub const MALFORMED_DIVERT: &str = "E0105";
    /// A block conditional missing `:`, a branch, or its closing `}`.
    pub const MALFORMED_CONDITIONAL: &str = "E0106";
    /// A malformed metadata or include directive.
    pub const MALFORMED_DIRECTIVE: &str = "E0107";
    /// An include that could not be resolved (no provider, or not found).
    pub const INCLUDE_FAILED: &str = "E0108";
    /// An include cycle (self-inclusion or mutual inclusion).
    pub const INCLUDE_CYCLE: &str = "E0109";

    // Parser (expression)
    /// An expression expected but another token found.
    pub const EXPECTED_EXPRESSION: &str = "E0201";
    /// A number literal that does not fit its type.
    pub const INVALID_NUMBER: &str = "E0202";
    /// An unterminated inline expression or conditional (`{` without `}`).
    pub const UNTERMINATED_INLINE: &str = "E0203";
    /// Expression nesting exceeded the parser's depth limit.
    pub const NESTING_TOO_DEEP: &str = "E0204";
    /// A bare name in expression position (variables are written `$name`).
    pub const BARE_NAME: &str = "E0205";
    /// An index applied to something that is not a variable.
    pub const INVALID_INDEX_TARGET: &str = "E0206";

    // Semantic
    /// A divert, tunnel, or thread naming an undeclared passage.
    pub const UNDEFINED_PASSAGE: &str = "E0301";
    /// A passage declared twice (reported at the second declaration).
    pub const DUPLICATE_PASSAGE: &str = "E0302";
    /// A call to an unknown function.
    pub const UNKNOWN_FUNCTION: &str = "E0303";
    /// A call with the wrong number of arguments.
    pub const WRONG_ARGUMENT_COUNT: &str = "E0304";
    /// A tunnel return (`->->`) outside any passage body.
    pub const MISPLACED_TUNNEL_RETURN: &str = "E0305";
    /// Narrative content outside any passage.
    pub const CONTENT_OUTSIDE_PASSAGE: &str = "E0306";
    /// A configured start passage that is not declared.
    pub const UNKNOWN_START_PASSAGE: &str = "E0307";

    // Warnings & hints
    /// A variable read before any assignment in the scope chain.
    pub const READ_BEFORE_WRITE: &str = "W0401";
    /// A variable assigned but never read.
    pub const UNUSED_VARIABLE: &str = "W0402";
    /// A passage with no inbound divert or choice that is not the start.
    pub const UNREACHABLE_PASSAGE: &str = "W0403";
    /// Indentation that does not match any enclosing level.
    pub const INCONSISTENT_INDENTATION: &str = "W0404";
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// An error that prevents code generation.
    Error,
    /// A warning that should be addressed but does not block compilation.
    Warning,
    /// An informational hint.
    Hint,
}

impl Severity {
    /// The severity name as it appears in the stable schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Hint => "hint",
        }
    }
}

/// A diagnostic produced by any phase of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stable identifier, e.g. `"E0301"`.
    pub code: &'static str,
    /// The severity of the diagnostic.
    pub severity: Severity,
    /// Human-readable message in narrative terminology.
    pub message: EcoString,
    /// The offending source location.
    pub span: Span,
    /// Optional one-line corrective suggestion.
    pub suggestion: Option<EcoString>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    #[must_use]
    pub fn error(code: &'static str, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            span,
            suggestion: None,
        }
    }

    /// Creates a new warning diagnostic.
    #[must_use]
    pub fn warning(code: &'static str, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message: message.into(),
            span,
            suggestion: None,
        }
    }

    /// Creates a new hint diagnostic.
    #[must_use]
    pub fn hint(code: &'static str, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            code,
            severity: Severity::Hint,
            message: message.into(),
            span,
            suggestion: None,
        }
    }

    /// Attaches a corrective suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<EcoString>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Returns true if this diagnostic has error severity.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Returns true if any diagnostic in the slice has error severity.
#[must_use]
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Renders diagnostics as plain-text source excerpts.
///
/// The reporter is stateless with respect to the diagnostics it formats:
/// it never discards or reorders them.
///
/// # Example output
///
/// ```text
/// error[E0301]: undefined passage `Ending`
///  --> 3:11
///   |
/// 3 | + [Go] -> Ending
///   |           ^^^^^^
///   = suggestion: did you mean `End`?
/// ```
#[derive(Debug)]
pub struct Reporter<'a> {
    source: &'a SourceText,
}

impl<'a> Reporter<'a> {
    /// Creates a reporter over the given source.
    #[must_use]
    pub fn new(source: &'a SourceText) -> Self {
        Self { source }
    }

    /// Renders a single diagnostic with its source excerpt.
    #[must_use]
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        use std::fmt::Write;

        let start = self.source.position_at(diagnostic.span.start());
        let end = self.source.position_at(diagnostic.span.end());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}[{}]: {}",
            diagnostic.severity.as_str(),
            diagnostic.code,
            diagnostic.message
        );
        let _ = writeln!(out, " --> {}:{}", start.line, start.column);

        if let Some(line) = self.source.line_text(start.line) {
            let gutter_width = start.line.to_string().len();
            let _ = writeln!(out, "{:gutter_width$} |", "");
            let _ = writeln!(out, "{} | {line}", start.line);

            // Underline the span on its first line. A span that continues
            // past the line end underlines to the end of the excerpt.
            let underline_len = if end.line == start.line {
                (end.column.saturating_sub(start.column)).max(1) as usize
            } else {
                line.chars().count().saturating_sub(start.column as usize - 1).max(1)
            };
            let pad = start.column.saturating_sub(1) as usize;
            let _ = writeln!(
                out,
                "{:gutter_width$} | {:pad$}{}",
                "",
                "",
                "^".repeat(underline_len)
            );
        }

        if let Some(suggestion) = &diagnostic.suggestion {
            let _ = writeln!(out, "  = suggestion: {suggestion}");
        }

        out
    }

    /// Renders every diagnostic in order, separated by blank lines.
    #[must_use]
    pub fn render_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| self.render(d))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A diagnostic wrapped for rich [`miette`] rendering.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{message}")]
pub struct ReportDiagnostic {
    /// Human-readable message.
    pub message: String,
    /// Source text for context.
    #[source_code]
    pub src: miette::NamedSource<String>,
    /// The offending location.
    #[label("{label}")]
    pub span: miette::SourceSpan,
    /// Label under the span (interpolated by the derive macro).
    pub label: String,
    /// Corrective suggestion, if one was computed.
    #[help]
    pub help: Option<String>,
}

impl ReportDiagnostic {
    /// Wraps a core diagnostic for miette rendering.
    #[must_use]
    pub fn from_diagnostic(diagnostic: &Diagnostic, source_name: &str, source: &str) -> Self {
        let label = match diagnostic.severity {
            Severity::Error => "error here",
            Severity::Warning => "warning here",
            Severity::Hint => "hint",
        };
        Self {
            message: format!("[{}] {}", diagnostic.code, diagnostic.message),
            src: miette::NamedSource::new(source_name, source.to_string()),
            span: diagnostic.span.into(),
            label: label.to_string(),
            help: diagnostic.suggestion.as_ref().map(ToString::to_string),
        }
    }
}

/// A line/column pair in the stable schema (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaPosition {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub column: u32,
}

/// A span in the stable schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaSpan {
    /// Start position (inclusive).
    pub start: SchemaPosition,
    /// End position (exclusive).
    pub end: SchemaPosition,
}

/// The stable machine-consumable diagnostic shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticSchema {
    /// Stable identifier, e.g. `"E0301"`.
    pub code: String,
    /// `"error"`, `"warning"`, or `"hint"`.
    pub severity: String,
    /// Human-readable message.
    pub message: String,
    /// The offending location in line/column terms.
    pub span: SchemaSpan,
    /// Corrective suggestion, or `null`.
    pub suggestion: Option<String>,
}

impl DiagnosticSchema {
    /// Converts a core diagnostic to the stable schema.
    #[must_use]
    pub fn from_diagnostic(diagnostic: &Diagnostic, source: &SourceText) -> Self {
        let start = source.position_at(diagnostic.span.start());
        let end = source.position_at(diagnostic.span.end());
        Self {
            code: diagnostic.code.to_string(),
            severity: diagnostic.severity.as_str().to_string(),
            message: diagnostic.message.to_string(),
            span: SchemaSpan {
                start: SchemaPosition {
                    line: start.line,
                    column: start.column,
                },
                end: SchemaPosition {
                    line: end.line,
                    column: end.column,
                },
            },
            suggestion: diagnostic.suggestion.as_ref().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_constructors() {
        let d = Diagnostic::error(codes::UNDEFINED_PASSAGE, "undefined passage", Span::new(0, 3));
        assert_eq!(d.code, "E0301");
        assert!(d.is_error());
        assert!(d.suggestion.is_none());

        let d = Diagnostic::warning(codes::UNUSED_VARIABLE, "unused", Span::new(0, 1))
            .with_suggestion("remove it");
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.suggestion.as_deref(), Some("remove it"));

        let d = Diagnostic::hint(codes::READ_BEFORE_WRITE, "hm", Span::new(0, 1));
        assert_eq!(d.severity, Severity::Hint);
    }

    #[test]
    fn has_errors_detects_error_severity() {
        let warning = Diagnostic::warning(codes::UNUSED_VARIABLE, "w", Span::new(0, 1));
        assert!(!has_errors(&[warning.clone()]));

        let error = Diagnostic::error(codes::UNEXPECTED_TOKEN, "e", Span::new(0, 1));
        assert!(has_errors(&[warning, error]));
    }

    #[test]
    fn reporter_renders_excerpt_with_caret() {
        let source = SourceText::new(":: Start\n+ [Go] -> Ending\n");
        let diagnostic = Diagnostic::error(
            codes::UNDEFINED_PASSAGE,
            "undefined passage `Ending`",
            Span::new(19, 25),
        )
        .with_suggestion("did you mean `End`?");

        let rendered = Reporter::new(&source).render(&diagnostic);
        assert!(rendered.contains("error[E0301]: undefined passage `Ending`"));
        assert!(rendered.contains(" --> 2:11"));
        assert!(rendered.contains("2 | + [Go] -> Ending"));
        assert!(rendered.contains("^^^^^^"));
        assert!(rendered.contains("suggestion: did you mean `End`?"));
    }

    #[test]
    fn reporter_render_all_preserves_order() {
        let source = SourceText::new("abc\n");
        let first = Diagnostic::error(codes::UNEXPECTED_TOKEN, "first", Span::new(0, 1));
        let second = Diagnostic::warning(codes::UNUSED_VARIABLE, "second", Span::new(1, 2));
        let rendered = Reporter::new(&source).render_all(&[first, second]);
        let first_at = rendered.find("first").unwrap();
        let second_at = rendered.find("second").unwrap();
        assert!(first_at < second_at);
    }

    #[test]
    fn schema_uses_line_column_positions() {
        let source = SourceText::new(":: Start\nHello\n");
        let diagnostic =
            Diagnostic::error(codes::UNEXPECTED_TOKEN, "unexpected", Span::new(9, 14));
        let schema = DiagnosticSchema::from_diagnostic(&diagnostic, &source);
        assert_eq!(schema.code, "E0101");
        assert_eq!(schema.severity, "error");
        assert_eq!(schema.span.start, SchemaPosition { line: 2, column: 1 });
        assert_eq!(schema.span.end, SchemaPosition { line: 2, column: 6 });
        assert_eq!(schema.suggestion, None);
    }

    #[test]
    fn report_diagnostic_wraps_for_miette() {
        let diagnostic = Diagnostic::error(codes::UNDEFINED_PASSAGE, "undefined passage", Span::new(0, 2))
            .with_suggestion("did you mean `End`?");
        let wrapped = ReportDiagnostic::from_diagnostic(&diagnostic, "story.weft", ":: A\n");
        assert!(wrapped.message.contains("E0301"));
        assert_eq!(wrapped.help.as_deref(), Some("did you mean `End`?"));
    }
}
