use insta::assert_snapshot;
use prefer_optional_chain::LintEngine;
use prefer_optional_chain::diagnostics::{Applicability, Diagnostic};
use prefer_optional_chain::fixer;
use prefer_optional_chain::rules::PreferOptionalChainOptions;
use std::path::Path;

fn lint(source: &str, options: PreferOptionalChainOptions) -> Vec<Diagnostic> {
    LintEngine::with_options(options)
        .lint_source(source)
        .expect("linting should succeed")
}

fn unsafe_options() -> PreferOptionalChainOptions {
    PreferOptionalChainOptions::default().with_unsafe_fixes(true)
}

/// Lints and applies every edit until the source stops changing.
fn fix_all(source: &str, options: PreferOptionalChainOptions) -> String {
    let mut current = source.to_string();
    for _ in 0..10 {
        let diags = lint(&current, options);
        let result = fixer::apply_fixes(&current, &diags, true).expect("fixes should apply");
        if result.fixes_applied == 0 {
            break;
        }
        current = result.fixed_source;
    }
    current
}

fn format_diags(diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(|d| {
            let fix = d
                .suggestion
                .as_ref()
                .map(|s| format!(" [{}: {}]", s.applicability.as_str(), s.edit.replacement))
                .unwrap_or_default();
            format!(
                "{}:{}:{}: {}{}",
                d.lint.name,
                d.span.start.row,
                d.span.start.column,
                d.level.as_str(),
                fix
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn single(diags: &[Diagnostic]) -> &Diagnostic {
    assert_eq!(diags.len(), 1, "expected one diagnostic, got {diags:#?}");
    &diags[0]
}

fn applicability(diag: &Diagnostic) -> Applicability {
    diag.suggestion
        .as_ref()
        .expect("diagnostic should carry a suggestion")
        .applicability
}

fn replacement(diag: &Diagnostic) -> &str {
    &diag
        .suggestion
        .as_ref()
        .expect("diagnostic should carry a suggestion")
        .edit
        .replacement
}

// ============================================================================
// && chains
// ============================================================================

#[test]
fn and_chain_base_cases() {
    let cases = [
        ("foo && foo.bar;", "foo?.bar;"),
        ("foo.bar && foo.bar.baz;", "foo.bar?.baz;"),
        ("foo && foo();", "foo?.();"),
        (
            "foo && foo.bar && foo.bar.baz && foo.bar.baz.buzz;",
            "foo?.bar?.baz?.buzz;",
        ),
        ("foo && foo.bar && foo.bar.baz.buzz;", "foo?.bar?.baz.buzz;"),
        ("foo.bar && foo.bar.baz.buzz;", "foo.bar?.baz.buzz;"),
        (
            "foo && foo[bar] && foo[bar].baz && foo[bar].baz.buzz;",
            "foo?.[bar]?.baz?.buzz;",
        ),
        (
            "foo && foo[bar.baz] && foo[bar.baz].buzz;",
            "foo?.[bar.baz]?.buzz;",
        ),
        (
            "foo && foo.bar && foo.bar.baz && foo.bar.baz.buzz();",
            "foo?.bar?.baz?.buzz();",
        ),
        (
            "foo && foo.bar && foo.bar.baz && foo.bar.baz.buzz && foo.bar.baz.buzz();",
            "foo?.bar?.baz?.buzz?.();",
        ),
        (
            "foo && foo.bar && foo.bar.baz.buzz();",
            "foo?.bar?.baz.buzz();",
        ),
        (
            "foo && foo.bar && foo.bar.baz && foo.bar.baz[buzz]();",
            "foo?.bar?.baz?.[buzz]();",
        ),
    ];

    for (input, expected) in cases {
        assert_eq!(fix_all(input, unsafe_options()), expected, "input: {input}");
    }
}

#[test]
fn trailing_unrelated_operand_is_kept() {
    assert_eq!(
        fix_all("foo && foo.bar && bing;", unsafe_options()),
        "foo?.bar && bing;"
    );
}

#[test]
fn each_chain_keeps_a_single_root() {
    let source = "foo && foo.bar && baz && baz.qux;";
    assert_eq!(fix_all(source, unsafe_options()), "foo?.bar && baz?.qux;");
    for diag in lint(source, unsafe_options()) {
        let text = replacement(&diag);
        assert!(text.starts_with("foo?.") || text.starts_with("baz?."), "{text}");
    }
    assert!(lint(source, PreferOptionalChainOptions::default()).is_empty());
}

#[test]
fn unsafe_option_turns_suggestion_into_fix() {
    let source = "declare const foo: { bar: number } | null | undefined;\nfoo && foo.bar;\n";
    let diags = lint(source, unsafe_options());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo?.bar");
}

#[test]
fn explicit_null_checks_on_every_guard_are_a_fix() {
    let source = "declare const foo: { bar: { baz: number } | null } | null;\n\
                  foo !== null && foo.bar !== null && foo.bar.baz;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo?.bar?.baz");
}

#[test]
fn strict_null_check_on_type_without_undefined_is_a_fix() {
    let source = "declare const foo: { a: number } | null;\nfoo !== null && foo.a;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo?.a");
}

#[test]
fn strict_null_check_on_null_and_undefined_type_is_a_suggestion() {
    let source = "declare const foo: { a: number } | null | undefined;\nfoo !== null && foo.a;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MaybeIncorrect);
    assert_eq!(replacement(diag), "foo?.a");

    let diags = lint(source, unsafe_options());
    assert_eq!(applicability(single(&diags)), Applicability::MachineApplicable);
}

#[test]
fn null_and_undefined_checks_merge_into_one_guard() {
    let source = "declare const foo: { bar: number } | null | undefined;\n\
                  foo !== null && foo !== undefined && foo.bar;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo?.bar");
}

#[test]
fn typeof_guarded_chain() {
    let source = "declare const foo: { bar: number } | undefined;\n\
                  typeof foo !== 'undefined' && foo.bar;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo?.bar");
    assert_eq!(
        fix_all(source, PreferOptionalChainOptions::default()),
        "declare const foo: { bar: number } | undefined;\nfoo?.bar;\n"
    );
}

#[test]
fn yoda_trailing_comparison_keeps_its_order() {
    let diags = lint("foo && 0 === foo.bar;", PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "0 === foo?.bar");
}

#[test]
fn non_null_assertions_bind_to_their_operand() {
    assert_eq!(fix_all("foo && foo!.bar;", unsafe_options()), "foo?.bar;");
    assert_eq!(
        fix_all("foo! && foo!.bar! && foo!.bar!.baz;", unsafe_options()),
        "foo!?.bar!?.baz;"
    );

    let source = "foo && foo.bar!.baz;";
    let diags = lint(source, unsafe_options());
    let diag = single(&diags);
    assert_eq!(replacement(diag), "foo?.bar!?.baz");
    let edit = &diag
        .suggestion
        .as_ref()
        .expect("diagnostic should carry a suggestion")
        .edit;
    assert_eq!((edit.start_byte, edit.end_byte), (0, source.len() - 1));
}

// ============================================================================
// Type-based opt-outs
// ============================================================================

#[test]
fn check_string_opt_out_skips_string_guards() {
    let source = "declare const foo: string | null;\nfoo && foo.length;\n";
    assert_eq!(lint(source, PreferOptionalChainOptions::default()).len(), 1);

    let options = PreferOptionalChainOptions {
        check_string: false,
        ..PreferOptionalChainOptions::default()
    };
    assert!(lint(source, options).is_empty());
}

#[test]
fn falsy_literal_member_needs_unsafe_fixes() {
    let source = "declare const foo: { a: number } | 0;\nfoo && foo.a;\n";
    assert!(lint(source, PreferOptionalChainOptions::default()).is_empty());

    let diags = lint(source, unsafe_options());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo?.a");
}

#[test]
fn truthiness_guard_on_non_nullable_value_is_a_suggestion() {
    let source = "declare const foo: { bar: number } | null;\nfoo && foo.bar;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MaybeIncorrect);
    assert_eq!(replacement(diag), "foo?.bar");
}

#[test]
fn nullable_last_access_is_a_fix() {
    let source = "declare const foo: { bar: string | null } | null;\nfoo && foo.bar;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    assert_eq!(applicability(single(&diags)), Applicability::MachineApplicable);
}

#[test]
fn trailing_comparison_is_a_fix() {
    let source = "declare const foo: { bar: number } | null;\nfoo && foo.bar === 0;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo?.bar === 0");
}

#[test]
fn suggestions_are_not_applied_without_opt_in() {
    let source = "declare const foo: { bar: number } | null;\nfoo && foo.bar;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let result = fixer::apply_fixes(source, &diags, false).expect("fixes should apply");
    assert_eq!(result.fixes_applied, 0);
    assert_eq!(result.fixes_skipped, 1);
    assert_eq!(result.fixed_source, source);
}

// ============================================================================
// || chains and empty-object fallbacks
// ============================================================================

#[test]
fn negated_or_chain() {
    let source = "declare const foo: { bar: { baz: string } } | null;\n!foo || !foo.bar;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    assert_eq!(replacement(single(&diags)), "!foo?.bar");
}

#[test]
fn yoda_comparison_in_or_chain_is_normalized() {
    let source = "declare const foo: { bar: { baz: number } | undefined };\n\
                  undefined === foo.bar || undefined === foo.bar.baz;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo.bar?.baz === undefined");
}

#[test]
fn trailing_plain_disjunct_is_kept() {
    let source = "foo == null || foo.bar == null || foo.bar.baz;";
    let diags = lint(source, PreferOptionalChainOptions::default());
    assert_eq!(replacement(single(&diags)), "foo?.bar == null || foo.bar.baz");

    assert_eq!(fix_all(source, unsafe_options()), "foo?.bar?.baz;");
}

#[test]
fn loose_not_null_check_does_not_start_an_or_chain() {
    assert!(lint("foo != null || foo.bar;", unsafe_options()).is_empty());
}

#[test]
fn empty_object_fallback() {
    let source = "declare const foo: { bar: number } | null;\n(foo || {}).bar;\n";
    let diags = lint(source, PreferOptionalChainOptions::default());
    let diag = single(&diags);
    assert_eq!(replacement(diag), "foo?.bar");
    assert_eq!(applicability(diag), Applicability::MaybeIncorrect);

    let diags = lint(source, unsafe_options());
    assert_eq!(applicability(single(&diags)), Applicability::MachineApplicable);
}

// ============================================================================
// Negative cases
// ============================================================================

#[test]
fn private_names_are_not_chained() {
    let source = "class Foo {\n  #bar: { baz: number } | null = null;\n  check(foo: Foo | null) {\n    return foo && foo.#bar;\n  }\n}\n";
    assert!(lint(source, PreferOptionalChainOptions::default()).is_empty());
}

#[test]
fn repeated_calls_are_not_guards() {
    let source = "declare function foo(): { bar: number } | null;\nfoo() && foo().bar;\n";
    assert!(lint(source, PreferOptionalChainOptions::default()).is_empty());
}

#[test]
fn repeated_calls_chain_only_under_unsafe_fixes() {
    let diags = lint("foo() && foo().bar;", unsafe_options());
    let diag = single(&diags);
    assert_eq!(applicability(diag), Applicability::MachineApplicable);
    assert_eq!(replacement(diag), "foo()?.bar");
}

#[test]
fn require_nullish_skips_plain_truthiness_guards() {
    let options = PreferOptionalChainOptions::default().with_require_nullish(true);
    assert!(lint("foo && foo.bar;", options).is_empty());
}


#[test]
fn unrelated_operands_are_left_alone() {
    assert!(lint("foo && bar.baz;", unsafe_options()).is_empty());
    assert!(lint("foo || bar;", unsafe_options()).is_empty());
}

#[test]
fn logical_expressions_inside_jsx_are_skipped() {
    let source = "const el = <div>{foo && foo.bar}</div>;\n";
    let diags = LintEngine::with_options(unsafe_options())
        .lint_source_with_path(source, Path::new("component.tsx"))
        .expect("linting should succeed");
    assert!(diags.is_empty(), "{diags:#?}");
}

// ============================================================================
// Whole-file behavior
// ============================================================================

#[test]
fn fixed_output_is_clean() {
    let source = "\
foo && foo.bar;
foo.bar && foo.bar.baz && foo.bar.baz.buzz;
(opts || {}).value;
";
    let fixed = fix_all(source, unsafe_options());
    assert_eq!(fixed, "foo?.bar;\nfoo.bar?.baz?.buzz;\nopts?.value;\n");
    assert!(lint(&fixed, unsafe_options()).is_empty());
}

#[test]
fn repeated_runs_are_identical() {
    let source = "a && a.b && a.b.c;\n!x || !x.y;\n(z ?? {}).w;\n";
    let first = format_diags(&lint(source, unsafe_options()));
    let second = format_diags(&lint(source, unsafe_options()));
    assert_eq!(first, second);
}

#[test]
fn diagnostics_snapshot() {
    let source = "\
declare const foo: { bar: string | null } | null;
foo && foo.bar;
(foo || {}).bar;
";
    let diags = lint(source, PreferOptionalChainOptions::default());
    assert_snapshot!(format_diags(&diags), @r###"
    prefer_optional_chain:2:1: warning [fix: foo?.bar]
    prefer_optional_chain:3:1: warning [suggestion: foo?.bar]
    "###);
}

#[test]
fn path_is_recorded_on_diagnostics() {
    let diags = LintEngine::with_options(unsafe_options())
        .lint_source_with_path("foo && foo.bar;\n", Path::new("src/index.ts"))
        .expect("linting should succeed");
    assert_eq!(single(&diags).file.as_deref(), Some("src/index.ts"));
}
