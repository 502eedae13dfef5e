use crate::fix::TextEdit;
use crate::lint::{LintDescriptor, LintLevel};
use tree_sitter::Range;

/// A single lint finding.
#[derive(Debug, Clone)]
#[must_use]
pub struct Diagnostic {
    pub lint: &'static LintDescriptor,
    pub level: LintLevel,
    pub file: Option<String>,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
    pub suggestion: Option<Suggestion>,
}

/// Rewrite attached to a diagnostic.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub message: String,
    pub edit: TextEdit,
    pub applicability: Applicability,
}

/// Applicability of an automated suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// Preserves the value of the expression; applied by `--fix`.
    MachineApplicable,
    /// May change the value (e.g. `false` becomes `undefined`); applied only
    /// with `--unsafe-fixes`.
    MaybeIncorrect,
}

impl Applicability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Applicability::MachineApplicable => "fix",
            Applicability::MaybeIncorrect => "suggestion",
        }
    }
}

/// Span in a source file (1-based row/column positions) plus its byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub start_byte: usize,
    pub end_byte: usize,
}

/// Single position in a source file (1-based row/column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Span {
    /// Construct a `Span` from a tree-sitter range, converting to 1-based positions.
    #[must_use]
    pub fn from_range(range: Range) -> Self {
        Self {
            start: Position {
                row: range.start_point.row + 1,
                column: range.start_point.column + 1,
            },
            end: Position {
                row: range.end_point.row + 1,
                column: range.end_point.column + 1,
            },
            start_byte: range.start_byte,
            end_byte: range.end_byte,
        }
    }
}
