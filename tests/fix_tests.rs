//! End-to-end tests for applying rule suggestions to source text.

use prefer_optional_chain::LintEngine;
use prefer_optional_chain::fix::{TextEdit, apply_fixes};
use prefer_optional_chain::fixer;
use prefer_optional_chain::rules::PreferOptionalChainOptions;
use regex::Regex;
use std::path::Path;

fn engine(allow_unsafe: bool) -> LintEngine {
    LintEngine::with_options(PreferOptionalChainOptions::default().with_unsafe_fixes(allow_unsafe))
}

/// Runs lint and fix passes the way `--fix` does.
fn fix_until_stable(source: &str, allow_unsafe: bool) -> (String, usize) {
    let engine = engine(allow_unsafe);
    let mut current = source.to_string();
    let mut applied = 0;
    for _ in 0..10 {
        let diags = engine.lint_source(&current).expect("linting should succeed");
        let result =
            fixer::apply_fixes(&current, &diags, allow_unsafe).expect("fixes should apply");
        if result.fixes_applied == 0 {
            break;
        }
        applied += result.fixes_applied;
        current = result.fixed_source;
    }
    (current, applied)
}

#[test]
fn fixes_every_chain_in_a_file() {
    let source = "\
function render(user) {
  const name = user && user.profile && user.profile.name;
  if (!user || !user.settings) {
    return null;
  }
  return (user.prefs || {}).theme;
}
";
    let (fixed, applied) = fix_until_stable(source, true);
    assert_eq!(applied, 3);
    assert_eq!(
        fixed,
        "\
function render(user) {
  const name = user?.profile?.name;
  if (!user?.settings) {
    return null;
  }
  return user.prefs?.theme;
}
"
    );
}

#[test]
fn safe_mode_only_applies_value_preserving_rewrites() {
    let source = "\
declare const a: { b: string | null } | null;
declare const c: { d: number } | null;
a && a.b;
c && c.d;
";
    let (fixed, applied) = fix_until_stable(source, false);
    assert_eq!(applied, 1);
    assert!(fixed.contains("a?.b;"));
    assert!(fixed.contains("c && c.d;"));
}

#[test]
fn comments_between_operands_survive() {
    let (fixed, _) = fix_until_stable("foo && /* guard */ foo.bar;\n", true);
    assert_eq!(fixed, "/* guard */ foo?.bar;\n");
}

#[test]
fn non_ascii_text_keeps_byte_offsets_aligned() {
    let source = "const s = \"héllo\"; foo && foo.bar;\n";
    let (fixed, _) = fix_until_stable(source, true);
    assert_eq!(fixed, "const s = \"héllo\"; foo?.bar;\n");
}

#[test]
fn apply_fixes_rejects_overlapping_edits() {
    let edits = vec![
        TextEdit::replace(0, 8, "a".to_string()),
        TextEdit::replace(4, 10, "b".to_string()),
    ];
    assert!(apply_fixes("0123456789", &edits).is_err());
}

#[test]
fn dry_run_diff_has_hunk_headers() {
    let original = "foo && foo.bar;\nconst x = 1;\n";
    let (fixed, _) = fix_until_stable(original, true);
    let diff = fixer::format_diff(original, &fixed, Path::new("src/app.ts"));

    let hunk = Regex::new(r"(?m)^@@ -\d+,\d+ \+\d+,\d+ @@$").expect("valid regex");
    assert!(hunk.is_match(&diff), "{diff}");
    assert!(diff.contains("-foo && foo.bar;"));
    assert!(diff.contains("+foo?.bar;"));
}
