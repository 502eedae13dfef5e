//! TypeScript linter that rewrites hand-written guard chains as optional
//! chains.
//!
//! The crate exposes a tree-sitter based `LintEngine`; the
//! `prefer_optional_chain` rule is the only built-in rule.

#![allow(clippy::new_without_default)] // LintRegistry::new() requires explicit construction

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fix;
pub mod fixer;
pub mod lint;
pub mod parser;
pub mod rules;
pub mod telemetry;
pub mod types;

use anyhow::Result;
use std::path::Path;
use tree_sitter::Tree;

use crate::diagnostics::Diagnostic;
use crate::error::OptionalChainError;
use crate::lint::{LintContext, LintRegistry, LintSettings};
use crate::parser::{Dialect, parse_source_as};
use crate::rules::PreferOptionalChainOptions;

/// Engine orchestrates linting by parsing source and running registered rules.
pub struct LintEngine {
    registry: LintRegistry,
    settings: LintSettings,
}

impl LintEngine {
    /// Create a new engine with default lint settings.
    pub fn new(registry: LintRegistry) -> Self {
        Self {
            registry,
            settings: LintSettings::default(),
        }
    }

    /// Create a new engine with explicit lint settings (e.g. from config).
    pub fn new_with_settings(registry: LintRegistry, settings: LintSettings) -> Self {
        Self { registry, settings }
    }

    /// Engine running the built-in rules configured with `options`.
    pub fn with_options(options: PreferOptionalChainOptions) -> Self {
        Self::new(rules::build_registry(options))
    }

    /// Lint a single in-memory TypeScript source string.
    pub fn lint_source(&self, source: &str) -> Result<Vec<Diagnostic>> {
        let tree = parse_source_as(source, Dialect::TypeScript)?;
        Ok(self.run_rules(source, &tree, None))
    }

    /// Lint `source` read from `path`; the extension selects the grammar and
    /// the path is recorded on every diagnostic.
    pub fn lint_source_with_path(&self, source: &str, path: &Path) -> Result<Vec<Diagnostic>> {
        let tree = parse_source_as(source, Dialect::for_path(path))
            .map_err(|err| OptionalChainError::parse(path, format!("{err:#}")))?;
        Ok(self.run_rules(source, &tree, Some(path)))
    }

    fn run_rules(&self, source: &str, tree: &Tree, path: Option<&Path>) -> Vec<Diagnostic> {
        let mut ctx = LintContext::new(source, self.settings.clone());
        let root = tree.root_node();

        for rule in self.registry.rules() {
            rule.check(root, source, &mut ctx);
        }

        let mut diagnostics = ctx.into_diagnostics();
        if let Some(path) = path {
            let file = path.display().to_string();
            for diag in &mut diagnostics {
                diag.file = Some(file.clone());
            }
        }
        diagnostics
    }
}

/// Construct a `LintEngine` with all built-in lints at their default options.
pub fn create_default_engine() -> LintEngine {
    LintEngine::new(LintRegistry::default_rules())
}
