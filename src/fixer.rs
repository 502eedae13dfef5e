//! Applies the edits carried by diagnostics to a source file.

use crate::diagnostics::{Applicability, Diagnostic};
use crate::fix::{FixError, TextEdit, apply_fixes as apply_edits, select_non_overlapping};
use std::fmt::Write;
use std::path::Path;

/// Result of applying fixes to a source file.
#[derive(Debug)]
pub struct FixResult {
    pub fixed_source: String,
    pub fixes_applied: usize,
    /// Suggestions that were not applied: unsafe without opt-in, or
    /// overlapping an edit applied in this pass.
    pub fixes_skipped: usize,
}

/// Apply fixes from diagnostics to source code.
///
/// `MaybeIncorrect` suggestions are only applied when `allow_unsafe` is set.
/// Overlapping edits keep the earliest one; rerunning the lint on the result
/// picks up the rest.
pub fn apply_fixes(
    source: &str,
    diagnostics: &[Diagnostic],
    allow_unsafe: bool,
) -> Result<FixResult, FixError> {
    let mut edits: Vec<TextEdit> = Vec::new();
    let mut skipped = 0;

    for diag in diagnostics {
        let Some(suggestion) = &diag.suggestion else {
            continue;
        };
        match suggestion.applicability {
            Applicability::MachineApplicable => {}
            Applicability::MaybeIncorrect if allow_unsafe => {}
            Applicability::MaybeIncorrect => {
                skipped += 1;
                continue;
            }
        }
        edits.push(suggestion.edit.clone());
    }

    let selected = select_non_overlapping(&edits);
    skipped += edits.len() - selected.len();
    let fixed_source = apply_edits(source, &selected)?;

    Ok(FixResult {
        fixed_source,
        fixes_applied: selected.len(),
        fixes_skipped: skipped,
    })
}

/// Generate a unified diff between original and fixed source.
///
/// Includes context lines (3 lines before and after each change).
pub fn format_diff(original: &str, fixed: &str, path: &Path) -> String {
    format_diff_with_context(original, fixed, path, 3)
}

type LineChange<'a> = (usize, Option<&'a str>, Option<&'a str>);

/// Generate a unified diff with configurable context lines.
pub fn format_diff_with_context(
    original: &str,
    fixed: &str,
    path: &Path,
    context: usize,
) -> String {
    let orig_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();
    let max_len = orig_lines.len().max(fixed_lines.len());

    let changes: Vec<LineChange> = (0..max_len)
        .filter_map(|i| {
            let orig = orig_lines.get(i).copied();
            let fix = fixed_lines.get(i).copied();
            (orig != fix).then_some((i, orig, fix))
        })
        .collect();
    if changes.is_empty() {
        return String::new();
    }

    // Group changes into hunks that share context.
    let mut hunks: Vec<(usize, usize, Vec<LineChange>)> = Vec::new();
    for change in changes {
        let start = change.0.saturating_sub(context);
        let end = (change.0 + context + 1).min(max_len);
        match hunks.last_mut() {
            Some((_, hunk_end, hunk_changes)) if start <= *hunk_end => {
                *hunk_end = end;
                hunk_changes.push(change);
            }
            _ => hunks.push((start, end, vec![change])),
        }
    }

    let path_str = path.display().to_string();
    let mut output = String::new();
    let _ = writeln!(output, "--- a/{path_str}");
    let _ = writeln!(output, "+++ b/{path_str}");

    for (hunk_start, hunk_end, hunk_changes) in hunks {
        let orig_size = hunk_end.min(orig_lines.len()).saturating_sub(hunk_start);
        let fixed_size = hunk_end.min(fixed_lines.len()).saturating_sub(hunk_start);
        let _ = writeln!(
            output,
            "@@ -{},{} +{},{} @@",
            hunk_start + 1,
            orig_size,
            hunk_start + 1,
            fixed_size
        );

        for line_idx in hunk_start..hunk_end {
            if let Some((_, orig, fix)) = hunk_changes.iter().find(|(i, _, _)| *i == line_idx) {
                if let Some(orig) = orig {
                    let _ = writeln!(output, "-{orig}");
                }
                if let Some(fix) = fix {
                    let _ = writeln!(output, "+{fix}");
                }
            } else if let Some(line) = orig_lines.get(line_idx) {
                let _ = writeln!(output, " {line}");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Span, Suggestion};
    use crate::lint::{FixDescriptor, LintCategory, LintDescriptor, LintLevel};

    static TEST_LINT: LintDescriptor = LintDescriptor {
        name: "test",
        category: LintCategory::Modernization,
        description: "test",
        fix: FixDescriptor::none(),
    };

    fn diagnostic(start: usize, end: usize, replacement: &str, applicability: Applicability) -> Diagnostic {
        Diagnostic {
            lint: &TEST_LINT,
            level: LintLevel::Warn,
            file: None,
            span: Span {
                start: crate::diagnostics::Position { row: 1, column: start + 1 },
                end: crate::diagnostics::Position { row: 1, column: end + 1 },
                start_byte: start,
                end_byte: end,
            },
            message: "test".into(),
            help: None,
            suggestion: Some(Suggestion {
                message: "Change to an optional chain.".into(),
                edit: TextEdit::replace(start, end, replacement.to_string()),
                applicability,
            }),
        }
    }

    #[test]
    fn test_apply_machine_applicable_only_by_default() {
        let source = "a && a.b; c && c.d;";
        let diags = [
            diagnostic(0, 8, "a?.b", Applicability::MachineApplicable),
            diagnostic(10, 18, "c?.d", Applicability::MaybeIncorrect),
        ];

        let result = apply_fixes(source, &diags, false).expect("fixes apply");
        assert_eq!(result.fixed_source, "a?.b; c && c.d;");
        assert_eq!(result.fixes_applied, 1);
        assert_eq!(result.fixes_skipped, 1);

        let result = apply_fixes(source, &diags, true).expect("fixes apply");
        assert_eq!(result.fixed_source, "a?.b; c?.d;");
    }

    #[test]
    fn test_overlapping_fixes_are_deferred() {
        let source = "a && a.b && a.b.c;";
        let diags = [
            diagnostic(0, 8, "a?.b", Applicability::MachineApplicable),
            diagnostic(0, 17, "a?.b?.c", Applicability::MachineApplicable),
        ];
        let result = apply_fixes(source, &diags, false).expect("fixes apply");
        assert_eq!(result.fixes_applied, 1);
        assert_eq!(result.fixes_skipped, 1);
    }

    #[test]
    fn test_format_diff() {
        let original = "const x = a && a.b;\nconst y = 1;";
        let fixed = "const x = a?.b;\nconst y = 1;";
        let diff = format_diff(original, fixed, Path::new("test.ts"));
        assert!(diff.contains("--- a/test.ts"));
        assert!(diff.contains("+++ b/test.ts"));
        assert!(diff.contains("-const x = a && a.b;"));
        assert!(diff.contains("+const x = a?.b;"));
        assert!(diff.contains(" const y = 1;"));
    }
}
