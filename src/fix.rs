//! Text edits and their application to source strings.
//!
//! All functions work on strings and byte offsets - no file I/O.
//!
//! ## Safety Guarantees
//!
//! - Edits are validated to be non-overlapping before application
//! - Edits are applied in reverse order to preserve byte offsets

use thiserror::Error;

/// Error type for fix application operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixError {
    #[error("Overlapping edits detected at byte {0}")]
    OverlappingEdits(usize),

    #[error("Edit range [{start}..{end}) exceeds source length {source_len}")]
    InvalidRange {
        start: usize,
        end: usize,
        source_len: usize,
    },

    #[error("Edit start {start} is after edit end {end}")]
    InvalidEditOrder { start: usize, end: usize },
}

/// Replacement of the byte range `[start_byte..end_byte)`.
///
/// Offsets are UTF-8 byte offsets, matching tree-sitter's byte-based API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start_byte: usize,
    pub end_byte: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(start_byte: usize, end_byte: usize, replacement: String) -> Self {
        Self {
            start_byte,
            end_byte,
            replacement,
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_byte..self.end_byte
    }

    /// Two ranges [a, b) and [c, d) overlap if a < d && c < b.
    pub fn overlaps_with(&self, other: &TextEdit) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }

    pub fn validate(&self, source_len: usize) -> Result<(), FixError> {
        if self.start_byte > self.end_byte {
            return Err(FixError::InvalidEditOrder {
                start: self.start_byte,
                end: self.end_byte,
            });
        }

        if self.end_byte > source_len {
            return Err(FixError::InvalidRange {
                start: self.start_byte,
                end: self.end_byte,
                source_len,
            });
        }

        Ok(())
    }
}

/// Validate that a list of edits are non-overlapping and within bounds.
pub fn validate_edits(edits: &[TextEdit], source_len: usize) -> Result<(), FixError> {
    for edit in edits {
        edit.validate(source_len)?;
    }

    for i in 0..edits.len() {
        for j in (i + 1)..edits.len() {
            if edits[i].overlaps_with(&edits[j]) {
                return Err(FixError::OverlappingEdits(edits[i].start_byte));
            }
        }
    }

    Ok(())
}

/// Keeps the earliest edit of every overlapping group, in source order.
///
/// The dropped edits are picked up by a later pass over the fixed source.
pub fn select_non_overlapping(edits: &[TextEdit]) -> Vec<TextEdit> {
    let mut sorted = edits.to_vec();
    sorted.sort_by_key(|e| (e.start_byte, e.end_byte));

    let mut selected: Vec<TextEdit> = Vec::with_capacity(sorted.len());
    for edit in sorted {
        if selected.last().is_some_and(|prev| prev.overlaps_with(&edit)) {
            continue;
        }
        selected.push(edit);
    }
    selected
}

/// Apply a list of non-overlapping edits to source code.
///
/// # Errors
///
/// Returns an error if:
/// - Edits overlap with each other
/// - Any edit has an invalid range
/// - Any edit exceeds source length
///
/// # Example
///
/// ```rust
/// use prefer_optional_chain::fix::{TextEdit, apply_fixes};
///
/// let source = "foo && foo.bar;";
/// let edits = vec![TextEdit::replace(0, 14, "foo?.bar".to_string())];
///
/// let result = apply_fixes(source, &edits).unwrap();
/// assert_eq!(result, "foo?.bar;");
/// ```
pub fn apply_fixes(source: &str, edits: &[TextEdit]) -> Result<String, FixError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    validate_edits(edits, source.len())?;

    let mut sorted_edits = edits.to_vec();
    sorted_edits.sort_by(|a, b| b.start_byte.cmp(&a.start_byte));

    let mut result = source.to_string();
    for edit in sorted_edits {
        result.replace_range(edit.range(), &edit.replacement);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps_with() {
        let edit1 = TextEdit::replace(0, 10, "a".to_string());
        let edit2 = TextEdit::replace(5, 15, "b".to_string());
        let edit3 = TextEdit::replace(10, 20, "c".to_string());

        assert!(edit1.overlaps_with(&edit2));
        assert!(edit2.overlaps_with(&edit1));
        assert!(!edit1.overlaps_with(&edit3));
        assert!(!edit3.overlaps_with(&edit1));
    }

    #[test]
    fn test_validate_edit_invalid_order() {
        let edit = TextEdit::replace(10, 5, "x".to_string());
        assert!(matches!(
            edit.validate(20),
            Err(FixError::InvalidEditOrder { .. })
        ));
    }

    #[test]
    fn test_validate_edit_exceeds_length() {
        let edit = TextEdit::replace(0, 15, "x".to_string());
        assert!(matches!(
            edit.validate(10),
            Err(FixError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_validate_edits_overlapping() {
        let edits = vec![
            TextEdit::replace(0, 10, "a".to_string()),
            TextEdit::replace(5, 15, "b".to_string()),
        ];
        assert_eq!(
            validate_edits(&edits, 20),
            Err(FixError::OverlappingEdits(0))
        );
    }

    #[test]
    fn test_apply_single_replacement() {
        let source = "foo && foo.bar;";
        let edit = TextEdit::replace(0, 14, "foo?.bar".to_string());
        let result = apply_fixes(source, &[edit]).expect("valid edit");
        assert_eq!(result, "foo?.bar;");
    }

    #[test]
    fn test_apply_edits_in_any_order() {
        let source = "a && a.b; c && c.d;";
        let edits = vec![
            TextEdit::replace(10, 18, "c?.d".to_string()),
            TextEdit::replace(0, 8, "a?.b".to_string()),
        ];
        let result = apply_fixes(source, &edits).expect("valid edits");
        assert_eq!(result, "a?.b; c?.d;");
    }

    #[test]
    fn test_no_edits_is_identity() {
        let source = "unchanged";
        assert_eq!(apply_fixes(source, &[]).expect("no edits"), source);
    }

    #[test]
    fn test_select_non_overlapping_keeps_earliest() {
        let edits = vec![
            TextEdit::replace(5, 15, "b".to_string()),
            TextEdit::replace(0, 10, "a".to_string()),
            TextEdit::replace(20, 25, "c".to_string()),
        ];
        let selected = select_non_overlapping(&edits);
        assert_eq!(
            selected.iter().map(|e| e.replacement.as_str()).collect::<Vec<_>>(),
            ["a", "c"]
        );
    }
}
