// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! The compilation pipeline.
//!
//! [`Compiler`] drives the phases end to end: parse, expand includes,
//! analyze, generate. Diagnostics accumulate across all phases and are
//! returned together in the [`CompileResult`]; a story is produced only
//! when no phase reported an error.
//!
//! Include resolution goes through the [`FileProvider`] seam so that
//! editors and tests can compile from memory. Without a provider,
//! `>> include` directives report `E0108`.

use std::collections::{HashMap, HashSet};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use ecow::{eco_format, EcoString};

use crate::ast::{Divert, Include, Passage, Script};
use crate::codegen::{generate, SourceMap, Story};
use crate::diagnostics::{codes, Diagnostic};
use crate::semantic_analysis::analyze;
use crate::source_analysis::{lex, parse, Token};
use crate::visit::{walk_divert_mut, MutVisitor};

/// Options controlling a compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Overrides start passage selection. Takes precedence over the
    /// `@@ start:` directive and the first-passage default.
    pub start_passage: Option<EcoString>,
}

/// Resolves include paths to file contents.
pub trait FileProvider {
    fn read(&self, path: &Utf8Path) -> io::Result<String>;
}

/// A provider backed by the filesystem, resolving paths under a root.
#[derive(Debug)]
pub struct FsFileProvider {
    root: Utf8PathBuf,
}

impl FsFileProvider {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileProvider for FsFileProvider {
    fn read(&self, path: &Utf8Path) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(path))
    }
}

/// An in-memory provider for tests and editor buffers.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileProvider {
    files: HashMap<Utf8PathBuf, String>,
}

impl MemoryFileProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<Utf8PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl FileProvider for MemoryFileProvider {
    fn read(&self, path: &Utf8Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}")))
    }
}

/// The outcome of a compilation.
#[derive(Debug)]
pub struct CompileResult {
    /// The compiled story, when no error was reported.
    pub story: Option<Story>,
    /// The story's source map; present exactly when `story` is.
    pub source_map: Option<SourceMap>,
    /// Every diagnostic from every phase, in emission order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    /// True when a story was produced. Warnings do not fail a compile.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.story.is_some()
    }
}

/// The pipeline driver.
#[derive(Default)]
pub struct Compiler<'p> {
    options: CompileOptions,
    provider: Option<&'p dyn FileProvider>,
}

impl<'p> Compiler<'p> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: CompileOptions::default(),
            provider: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Attaches a file provider for `>> include` resolution.
    #[must_use]
    pub fn with_provider(mut self, provider: &'p dyn FileProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Compiles a source string.
    #[must_use]
    pub fn compile(&self, source: &str) -> CompileResult {
        let mut visited = HashSet::new();
        self.compile_inner(source, &mut visited)
    }

    /// Compiles the file at `path`, read through the provider.
    ///
    /// Unlike [`compile`](Self::compile), the root file participates in
    /// cycle detection, so a script including itself reports `E0109`.
    #[must_use]
    pub fn compile_file(&self, path: &Utf8Path) -> CompileResult {
        let Some(provider) = self.provider else {
            return CompileResult {
                story: None,
                source_map: None,
                diagnostics: vec![Diagnostic::error(
                    codes::INCLUDE_FAILED,
                    eco_format!("cannot read `{path}`: no file provider configured"),
                    crate::source_analysis::Span::default(),
                )],
            };
        };
        let source = match provider.read(path) {
            Ok(source) => source,
            Err(err) => {
                return CompileResult {
                    story: None,
                    source_map: None,
                    diagnostics: vec![Diagnostic::error(
                        codes::INCLUDE_FAILED,
                        eco_format!("cannot read `{path}`: {err}"),
                        crate::source_analysis::Span::default(),
                    )],
                }
            }
        };
        let mut visited = HashSet::new();
        visited.insert(path.to_owned());
        self.compile_inner(&source, &mut visited)
    }

    fn compile_inner(&self, source: &str, visited: &mut HashSet<Utf8PathBuf>) -> CompileResult {
        let (mut script, mut diagnostics) = parse(source);

        let includes = std::mem::take(&mut script.includes);
        for include in &includes {
            self.expand_include(include, &mut script.passages, &mut diagnostics, visited);
        }
        script.includes = includes;

        let mut analysis = analyze(&mut script, self.options.start_passage.as_deref());
        diagnostics.append(&mut analysis.diagnostics);

        match generate(&script, &analysis, &diagnostics) {
            Ok((story, source_map)) => CompileResult {
                story: Some(story),
                source_map: Some(source_map),
                diagnostics,
            },
            Err(_) => CompileResult {
                story: None,
                source_map: None,
                diagnostics,
            },
        }
    }

    /// Loads one include, expanding its own includes first, and splices
    /// its passages into `passages`.
    fn expand_include(
        &self,
        include: &Include,
        passages: &mut Vec<Passage>,
        diagnostics: &mut Vec<Diagnostic>,
        visited: &mut HashSet<Utf8PathBuf>,
    ) {
        let Some(provider) = self.provider else {
            diagnostics.push(Diagnostic::error(
                codes::INCLUDE_FAILED,
                eco_format!(
                    "cannot include `{}`: no file provider configured",
                    include.path
                ),
                include.path_span,
            ));
            return;
        };

        let path = Utf8PathBuf::from(include.path.as_str());
        if !visited.insert(path.clone()) {
            diagnostics.push(Diagnostic::error(
                codes::INCLUDE_CYCLE,
                eco_format!("include cycle involving `{}`", include.path),
                include.path_span,
            ));
            return;
        }

        let source = match provider.read(&path) {
            Ok(source) => source,
            Err(err) => {
                diagnostics.push(Diagnostic::error(
                    codes::INCLUDE_FAILED,
                    eco_format!("cannot include `{}`: {err}", include.path),
                    include.path_span,
                ));
                return;
            }
        };

        let (mut sub, sub_diagnostics) = parse(&source);
        // Included diagnostics keep their own spans but say which file
        // they came from.
        for diagnostic in sub_diagnostics {
            diagnostics.push(Diagnostic {
                message: eco_format!("{}: {}", include.path, diagnostic.message),
                ..diagnostic
            });
        }

        let nested = std::mem::take(&mut sub.includes);
        for inner in &nested {
            self.expand_include(inner, &mut sub.passages, diagnostics, visited);
        }

        if let Some(alias) = &include.alias {
            apply_alias(&mut sub, &alias.name);
        }
        passages.append(&mut sub.passages);
    }
}

impl std::fmt::Debug for Compiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

/// Prefixes an included script's passage names with `alias.` and rewrites
/// internal divert targets to match. References to passages the included
/// file does not declare are left alone, so an include can still divert
/// into the including story.
fn apply_alias(script: &mut Script, alias: &EcoString) {
    let local: HashSet<EcoString> = script
        .passages
        .iter()
        .map(|p| p.name.name.clone())
        .collect();

    let mut rewriter = AliasRewriter { alias, local };
    rewriter.visit_script(script);

    for passage in &mut script.passages {
        passage.name.name = eco_format!("{alias}.{}", passage.name.name);
    }
}

struct AliasRewriter<'a> {
    alias: &'a EcoString,
    local: HashSet<EcoString>,
}

impl MutVisitor for AliasRewriter<'_> {
    fn visit_divert(&mut self, divert: &mut Divert) {
        if self.local.contains(&divert.target.name) {
            divert.target.name = eco_format!("{}.{}", self.alias, divert.target.name);
        }
        walk_divert_mut(self, divert);
    }
}

/// Compiles a source string with default options and no file provider.
#[must_use]
pub fn compile(source: &str) -> CompileResult {
    Compiler::new().compile(source)
}

/// Parses a source string without semantic analysis or generation.
///
/// Formatters and outliners use this when they want the tree, mistakes
/// and all.
#[must_use]
pub fn parse_only(source: &str) -> (Script, Vec<Diagnostic>) {
    parse(source)
}

/// Parses and analyzes a source string, returning only its diagnostics.
///
/// Editor integrations use this for on-keystroke checking where the
/// compiled story is not needed.
#[must_use]
pub fn validate(source: &str) -> Vec<Diagnostic> {
    let (mut script, mut diagnostics) = parse(source);
    let mut analysis = analyze(&mut script, None);
    diagnostics.append(&mut analysis.diagnostics);
    diagnostics
}

/// Lexes a source string, for editor tooling such as highlighters.
#[must_use]
pub fn tokens(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    lex(source)
}
