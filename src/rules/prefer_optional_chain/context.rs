//! Per-file analysis state: memo caches keyed by node identity plus the
//! range sets that keep chains from being reported twice.

use super::fixgen::ChainPart;
use super::options::PreferOptionalChainOptions;
use crate::fix::TextEdit;
use crate::types::{TypeInfo, TypeQuery};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tree_sitter::{Node, Range};

/// Half-open byte interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub(crate) fn of(node: Node) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }

    pub(crate) fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Whether a rewrite is applied unconditionally or offered for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FixKind {
    Fix,
    Suggestion,
}

/// One accepted rewrite, before conversion into a diagnostic.
#[derive(Debug, Clone)]
pub(crate) struct Report {
    /// Where the diagnostic points.
    pub anchor: Range,
    pub edit: TextEdit,
    pub kind: FixKind,
}

pub(crate) struct Analysis<'a, 't> {
    pub source: &'t str,
    pub options: PreferOptionalChainOptions,
    types: &'a dyn TypeQuery<'t>,
    type_cache: RefCell<HashMap<usize, TypeInfo>>,
    normalized: RefCell<HashMap<usize, String>>,
    flattened: RefCell<HashMap<usize, Vec<ChainPart>>>,
    signatures: RefCell<HashMap<usize, Vec<(String, String)>>>,
    /// `&&` nodes already consumed as part of a larger chain.
    pub(super) seen_and: HashSet<usize>,
    pub(super) processed_and: Vec<TextRange>,
    /// `||` expressions already consumed, by range.
    pub(super) seen_or: HashSet<TextRange>,
    /// Operand ranges covered by an emitted report.
    pub(super) reported: HashSet<TextRange>,
    reports: Vec<Report>,
}

impl<'a, 't> Analysis<'a, 't> {
    pub(crate) fn new(
        source: &'t str,
        options: PreferOptionalChainOptions,
        types: &'a dyn TypeQuery<'t>,
    ) -> Self {
        Self {
            source,
            options,
            types,
            type_cache: RefCell::new(HashMap::new()),
            normalized: RefCell::new(HashMap::new()),
            flattened: RefCell::new(HashMap::new()),
            signatures: RefCell::new(HashMap::new()),
            seen_and: HashSet::new(),
            processed_and: Vec::new(),
            seen_or: HashSet::new(),
            reported: HashSet::new(),
            reports: Vec::new(),
        }
    }

    pub(crate) fn unsafe_fixes(&self) -> bool {
        self.options.allow_unsafe_fixes
    }

    pub(crate) fn text(&self, node: Node) -> &'t str {
        crate::rules::util::slice(self.source, node)
    }

    pub(crate) fn text_range(&self, start: usize, end: usize) -> &'t str {
        crate::rules::util::slice_range(self.source, start, end)
    }

    pub(crate) fn type_info(&self, node: Node<'t>) -> TypeInfo {
        if let Some(info) = self.type_cache.borrow().get(&node.id()) {
            return *info;
        }
        let info = self.types.type_info(node);
        self.type_cache.borrow_mut().insert(node.id(), info);
        info
    }

    pub(super) fn cached_normalized(
        &self,
        node: Node<'t>,
        compute: impl FnOnce() -> String,
    ) -> String {
        if let Some(text) = self.normalized.borrow().get(&node.id()) {
            return text.clone();
        }
        let text = compute();
        self.normalized.borrow_mut().insert(node.id(), text.clone());
        text
    }

    pub(super) fn cached_flattened(
        &self,
        node: Node<'t>,
        compute: impl FnOnce() -> Vec<ChainPart>,
    ) -> Vec<ChainPart> {
        if let Some(parts) = self.flattened.borrow().get(&node.id()) {
            return parts.clone();
        }
        let parts = compute();
        self.flattened.borrow_mut().insert(node.id(), parts.clone());
        parts
    }

    pub(super) fn cached_signatures(
        &self,
        node: Node<'t>,
        compute: impl FnOnce() -> Vec<(String, String)>,
    ) -> Vec<(String, String)> {
        if let Some(sigs) = self.signatures.borrow().get(&node.id()) {
            return sigs.clone();
        }
        let sigs = compute();
        self.signatures.borrow_mut().insert(node.id(), sigs.clone());
        sigs
    }

    pub(super) fn overlaps_reported(&self, range: TextRange) -> bool {
        self.reported.iter().any(|r| r.overlaps(&range))
    }

    pub(super) fn mark_reported(&mut self, nodes: impl IntoIterator<Item = Node<'t>>) {
        for node in nodes {
            self.reported.insert(TextRange::of(node));
        }
    }

    pub(super) fn push_report(&mut self, report: Report) {
        self.reports.push(report);
    }

    pub(crate) fn into_reports(self) -> Vec<Report> {
        self.reports
    }
}
