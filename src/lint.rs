use crate::diagnostics::{Diagnostic, Span, Suggestion};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

// ============================================================================
// Lint Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Allow,
    #[default]
    Warn,
    Error,
}

impl LintLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintLevel::Allow => "allow",
            LintLevel::Warn => "warning",
            LintLevel::Error => "error",
        }
    }
}

// ============================================================================
// Fix Descriptors
// ============================================================================

/// Safety classification for auto-fixes.
///
/// - `Safe` fixes preserve the value of the rewritten expression
/// - `Unsafe` fixes may change it (e.g. `false` becoming `undefined`) and
///   require explicit opt-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FixSafety {
    #[default]
    Safe,
    Unsafe,
}

impl FixSafety {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixSafety::Safe => "safe",
            FixSafety::Unsafe => "unsafe",
        }
    }
}

/// Descriptor for an auto-fix associated with a lint rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixDescriptor {
    pub available: bool,
    pub safety: FixSafety,
    pub description: &'static str,
}

impl FixDescriptor {
    pub const fn safe(description: &'static str) -> Self {
        Self {
            available: true,
            safety: FixSafety::Safe,
            description,
        }
    }

    pub const fn unsafe_fix(description: &'static str) -> Self {
        Self {
            available: true,
            safety: FixSafety::Unsafe,
            description,
        }
    }

    pub const fn none() -> Self {
        Self {
            available: false,
            safety: FixSafety::Safe,
            description: "",
        }
    }
}

// ============================================================================
// Lint Categories
// ============================================================================

/// High-level categories used to group lints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LintCategory {
    /// Code that can be written more concisely with modern syntax.
    Modernization,
}

impl LintCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintCategory::Modernization => "modernization",
        }
    }
}

/// Static metadata for a lint.
#[derive(Debug)]
pub struct LintDescriptor {
    pub name: &'static str,
    pub category: LintCategory,
    pub description: &'static str,
    pub fix: FixDescriptor,
}

/// A single lint rule that can inspect a syntax tree.
pub trait LintRule: Send + Sync {
    fn descriptor(&self) -> &'static LintDescriptor;
    fn check(&self, root: Node, source: &str, ctx: &mut LintContext<'_>);
}

/// Per-lint configuration derived from `prefer-optional-chain.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintSettings {
    levels: HashMap<String, LintLevel>,
}

impl LintSettings {
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, LintLevel>) -> Self {
        for (name, level) in levels {
            let canonical = resolve_lint_alias(&name);
            self.levels.insert(canonical.to_string(), level);
        }
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for name in disabled {
            let canonical = resolve_lint_alias(&name);
            self.levels.insert(canonical.to_string(), LintLevel::Allow);
        }
        self
    }

    pub fn level_for(&self, lint_name: &str) -> LintLevel {
        if let Some(&level) = self.levels.get(lint_name) {
            return level;
        }
        let canonical = resolve_lint_alias(lint_name);
        self.levels.get(canonical).copied().unwrap_or_default()
    }
}

/// Mutable context passed to lint rules while traversing a file.
pub struct LintContext<'src> {
    source: &'src str,
    settings: LintSettings,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> LintContext<'src> {
    pub fn new(source: &'src str, settings: LintSettings) -> Self {
        Self {
            source,
            settings,
            diagnostics: Vec::new(),
        }
    }

    /// Report a finding at `span`, dropping it when the lint is allowed.
    pub fn report_span(
        &mut self,
        lint: &'static LintDescriptor,
        span: Span,
        message: impl Into<String>,
        suggestion: Option<Suggestion>,
    ) {
        let level = self.settings.level_for(lint.name);
        if level == LintLevel::Allow {
            return;
        }

        self.diagnostics.push(Diagnostic {
            lint,
            level,
            file: None,
            span,
            message: message.into(),
            help: None,
            suggestion,
        });
    }

    /// Report an already-constructed diagnostic, re-leveling it from settings.
    pub fn report_diagnostic(&mut self, mut diagnostic: Diagnostic) {
        let level = self.settings.level_for(diagnostic.lint.name);
        if level == LintLevel::Allow {
            return;
        }
        diagnostic.level = level;
        self.diagnostics.push(diagnostic);
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn settings(&self) -> &LintSettings {
        &self.settings
    }

    #[must_use]
    pub fn into_diagnostics(mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by_key(|d| (d.span.start.row, d.span.start.column));
        self.diagnostics
    }
}

// ============================================================================
// Lint Name Aliases
// ============================================================================

/// Alternate spellings accepted in config files and CLI arguments.
///
/// Format: (alias, canonical_name)
pub const LINT_ALIASES: &[(&str, &str)] = &[("prefer-optional-chain", "prefer_optional_chain")];

pub fn resolve_lint_alias(name: &str) -> &str {
    for (alias, canonical) in LINT_ALIASES {
        if *alias == name {
            return canonical;
        }
    }
    name
}

pub fn all_known_lints_with_aliases() -> HashSet<&'static str> {
    let mut known: HashSet<&'static str> = LintRegistry::default_rules()
        .descriptors()
        .map(|d| d.name)
        .collect();
    for (alias, _) in LINT_ALIASES {
        known.insert(alias);
    }
    known
}

/// Registry of lint rules run by the engine.
pub struct LintRegistry {
    rules: Vec<Box<dyn LintRule>>,
}

impl Default for LintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LintRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl LintRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &Box<dyn LintRule>> {
        self.rules.iter()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static LintDescriptor> + '_ {
        self.rules.iter().map(|r| r.descriptor())
    }

    pub fn find_descriptor(&self, name: &str) -> Option<&'static LintDescriptor> {
        let name = resolve_lint_alias(name);
        self.descriptors().find(|d| d.name == name)
    }

    #[must_use = "registry should be used to create an engine"]
    pub fn default_rules() -> Self {
        crate::rules::build_registry(Default::default())
    }

    /// Built-in rules restricted by `only`, `skip` and `disabled`.
    ///
    /// # Errors
    ///
    /// Returns error if any lint name in `only`, `skip`, or `disabled` is unknown.
    pub fn default_rules_filtered(
        only: &[String],
        skip: &[String],
        disabled: &[String],
        options: crate::rules::PreferOptionalChainOptions,
    ) -> Result<Self> {
        let known = all_known_lints_with_aliases();
        for n in only.iter().chain(skip.iter()).chain(disabled.iter()) {
            if !known.contains(n.as_str()) {
                return Err(anyhow!("unknown lint: {n}"));
            }
        }

        let only_set: Option<HashSet<&str>> = if only.is_empty() {
            None
        } else {
            Some(only.iter().map(|s| resolve_lint_alias(s)).collect())
        };
        let excluded: HashSet<&str> = skip
            .iter()
            .chain(disabled.iter())
            .map(|s| resolve_lint_alias(s))
            .collect();

        let mut reg = Self::new();
        for rule in crate::rules::build_registry(options).rules {
            let name = rule.descriptor().name;
            if let Some(ref only) = only_set
                && !only.contains(name)
            {
                continue;
            }
            if excluded.contains(name) {
                continue;
            }
            reg.rules.push(rule);
        }

        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_resolve_aliases_and_disable() {
        let levels = HashMap::from([("prefer-optional-chain".to_string(), LintLevel::Error)]);
        let settings = LintSettings::default().with_config_levels(levels);
        assert_eq!(settings.level_for("prefer_optional_chain"), LintLevel::Error);

        let settings = settings.disable(["prefer_optional_chain".to_string()]);
        assert_eq!(settings.level_for("prefer-optional-chain"), LintLevel::Allow);
        assert_eq!(LintSettings::default().level_for("anything"), LintLevel::Warn);
    }

    #[test]
    fn filtered_registry_rejects_unknown_names() {
        let err = LintRegistry::default_rules_filtered(
            &["no_such_lint".to_string()],
            &[],
            &[],
            Default::default(),
        )
        .err()
        .expect("unknown lint should be rejected");
        assert!(err.to_string().contains("no_such_lint"));
    }

    #[test]
    fn filtered_registry_skips_rules() {
        let reg = LintRegistry::default_rules_filtered(
            &[],
            &["prefer_optional_chain".to_string()],
            &[],
            Default::default(),
        )
        .expect("known lint");
        assert_eq!(reg.descriptors().count(), 0);

        let reg = LintRegistry::default_rules();
        assert!(reg.find_descriptor("prefer-optional-chain").is_some());
    }
}
