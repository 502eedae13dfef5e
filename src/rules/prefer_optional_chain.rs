//! Suggests `foo?.bar` in place of hand-written guard chains such as
//! `foo && foo.bar`, `!foo || !foo.bar` and `(foo || {}).bar`.
//!
//! Each `&&`/`||` expression is split into operands, every operand is
//! classified (plain truthiness, `!= null`, `typeof`, ...), consecutive
//! operands that guard a growing access chain are grouped, and the group is
//! rewritten as a single optional chain. Whether the rewrite is an automatic
//! fix or only a suggestion depends on whether it preserves the value of the
//! original expression.

mod and_chain;
mod compare;
mod context;
mod empty_object;
mod fixgen;
mod operand;
pub mod options;
mod or_chain;
mod regroup;
mod safety;

use crate::diagnostics::{Applicability, Span, Suggestion};
use crate::instrument_block;
use crate::lint::{FixDescriptor, LintCategory, LintContext, LintDescriptor, LintRule};
use crate::rules::util::walk;
use crate::trace_event;
use crate::types::DeclaredTypes;
use context::{Analysis, FixKind};
use options::PreferOptionalChainOptions;
use regroup::regroup_logicals;
use std::collections::HashSet;
use tree_sitter::Node;

const MESSAGE: &str =
    "Prefer using an optional chain expression instead, as it's more concise and easier to read.";
const SUGGESTION_MESSAGE: &str = "Change to an optional chain.";

static PREFER_OPTIONAL_CHAIN: LintDescriptor = LintDescriptor {
    name: "prefer_optional_chain",
    category: LintCategory::Modernization,
    description: "Enforce consistent use of optional chain expressions (`foo?.bar`) over chained logical guards",
    fix: FixDescriptor::unsafe_fix("Rewrite the guarded chain as a single optional chain"),
};

#[derive(Debug, Default, Clone)]
pub struct PreferOptionalChainLint {
    options: PreferOptionalChainOptions,
}

impl PreferOptionalChainLint {
    pub fn new(options: PreferOptionalChainOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PreferOptionalChainOptions {
        &self.options
    }
}

impl LintRule for PreferOptionalChainLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &PREFER_OPTIONAL_CHAIN
    }

    fn check(&self, root: Node, source: &str, ctx: &mut LintContext<'_>) {
        let reports = instrument_block!("prefer_optional_chain", {
            let regrouped = regroup_logicals(root, source);
            let misgrouped: HashSet<usize> = regrouped
                .iter()
                .flat_map(|group| group.logicals.iter().copied())
                .collect();
            let types = DeclaredTypes::collect(root, source);
            let mut analysis = Analysis::new(source, self.options, &types);

            walk(root, &mut |node| {
                if let Some(group) = regrouped.iter().find(|group| group.top.id() == node.id()) {
                    match group.operator {
                        "&&" => analysis.check_and_operands(group.top, &group.operands()),
                        _ => analysis.check_or_operands(group.top, &group.operands()),
                    }
                    return;
                }
                if node.kind() != "binary_expression" || misgrouped.contains(&node.id()) {
                    return;
                }
                match node.child_by_field_name("operator").map(|op| op.kind()) {
                    Some("&&") => analysis.check_and_chain(node),
                    Some("||") => {
                        analysis.check_or_chain(node);
                        analysis.check_empty_object(node);
                    }
                    Some("??") => analysis.check_empty_object(node),
                    _ => {}
                }
            });

            analysis.into_reports()
        });

        trace_event!(count = reports.len(), "optional chain reports");
        for report in reports {
            let applicability = match report.kind {
                FixKind::Fix => Applicability::MachineApplicable,
                FixKind::Suggestion => Applicability::MaybeIncorrect,
            };
            ctx.report_span(
                self.descriptor(),
                Span::from_range(report.anchor),
                MESSAGE,
                Some(Suggestion {
                    message: SUGGESTION_MESSAGE.to_string(),
                    edit: report.edit,
                    applicability,
                }),
            );
        }
    }
}
