//! `!foo || !foo.bar` → `!foo?.bar`

use super::compare::Relation;
use super::context::{Analysis, FixKind, Report, TextRange};
use super::fixgen::{CheckedLengths, build_optional_chain};
use super::operand::{LogicalOp, Operand, OperandKind, classify};
use crate::fix::TextEdit;
use crate::rules::util::{
    access_object, base_expression, binary_parts, is_access, is_call, is_identifier_or_this,
    is_inside_jsx, is_logical, is_null, is_undefined_ident, is_undefined_value, is_void_expr,
    parent_through_parens, same_node, unwrap_parens,
};
use crate::trace_event;
use tree_sitter::Node;

/// Whether the operand can take part in an `||` chain.
fn is_or_operand(kind: OperandKind, unsafe_fixes: bool) -> bool {
    match kind {
        OperandKind::Not
        | OperandKind::Comparison
        | OperandKind::Plain
        | OperandKind::TypeofCheck
        | OperandKind::NotStrictEqualNull
        | OperandKind::NotStrictEqualUndefined
        | OperandKind::NotEqualBoth => true,
        OperandKind::StrictEqualNull | OperandKind::EqualNull | OperandKind::StrictEqualUndefined => unsafe_fixes,
        _ => false,
    }
}

/// Operands that end an `||` chain on a comparison of the accessed value.
fn is_comparison_or_null_check(kind: OperandKind) -> bool {
    kind == OperandKind::Comparison || kind.is_null_check()
}

fn collect_operands<'t>(node: Node<'t>, nested: &mut Vec<TextRange>, out: &mut Vec<Node<'t>>) {
    let inner = unwrap_parens(node);
    match binary_parts(inner) {
        Some((left, "||", right)) => {
            collect_operands(left, nested, out);
            collect_operands(right, nested, out);
            nested.push(TextRange::of(inner));
        }
        _ => out.push(node),
    }
}

impl<'a, 't> Analysis<'a, 't> {
    pub(crate) fn check_or_chain(&mut self, node: Node<'t>) {
        if !is_logical(node, "||") {
            return;
        }
        let (parent, _) = parent_through_parens(node);
        if let Some((left, "||", right)) = parent.and_then(binary_parts)
            && (same_node(unwrap_parens(left), node) || same_node(unwrap_parens(right), node))
        {
            return;
        }

        let mut nested = Vec::new();
        let mut operand_nodes = Vec::new();
        collect_operands(node, &mut nested, &mut operand_nodes);
        self.check_or_operands(node, &operand_nodes);
        self.seen_or.extend(nested);
    }

    /// `node` spans the whole `||` expression made of `operand_nodes`.
    pub(crate) fn check_or_operands(&mut self, node: Node<'t>, operand_nodes: &[Node<'t>]) {
        let range = TextRange::of(node);
        if !self.seen_or.insert(range) || is_inside_jsx(node) {
            return;
        }
        if operand_nodes.len() < 2
            || operand_nodes
                .iter()
                .any(|&n| self.reported.contains(&TextRange::of(n)))
        {
            return;
        }

        let operands: Vec<Operand<'t>> = operand_nodes
            .iter()
            .map(|&n| classify(n, LogicalOp::Or, self.source))
            .collect();

        let (chain, trailing_comparison) = self.scan_or_operands(&operands);
        if chain.len() < 2 || !self.or_chain_is_convertible(&chain) {
            return;
        }
        let Some(report) = self.or_chain_fix(&chain, node, operand_nodes.len(), trailing_comparison) else {
            return;
        };
        self.push_report(report);
        self.mark_reported(chain.iter().map(|op| op.node));
    }

    /// `foo != null` seeding `foo != null || foo.bar` would be rewritten
    /// into a test of `foo.bar`.
    fn is_negated_nullish_seed(&self, op: &Operand<'t>) -> bool {
        if op.kind != OperandKind::Comparison || !is_identifier_or_this(unwrap_parens(op.compared)) {
            return false;
        }
        op.binary().is_some_and(|(left, operator, right)| {
            matches!(operator, "!=" | "!==")
                && [left, right]
                    .into_iter()
                    .any(|side| is_null(side) || is_undefined_value(side, self.source))
        })
    }

    fn scan_or_operands(&self, operands: &[Operand<'t>]) -> (Vec<Operand<'t>>, bool) {
        let unsafe_fixes = self.unsafe_fixes();
        let mut chain: Vec<Operand<'t>> = Vec::new();
        let mut last_expr: Option<Node<'t>> = None;
        let mut trailing_comparison = false;

        for op in operands {
            let op = *op;
            trace_event!(kind = ?op.kind, operand = self.text(op.compared), "or operand");

            let seeds_nothing = chain.is_empty() && self.is_negated_nullish_seed(&op);
            if !is_or_operand(op.kind, unsafe_fixes) || seeds_nothing {
                if chain.len() >= 2 {
                    break;
                }
                chain.clear();
                last_expr = None;
                continue;
            }

            let Some(last) = last_expr else {
                chain.push(op);
                last_expr = Some(op.compared);
                trailing_comparison = is_comparison_or_null_check(op.kind);
                continue;
            };

            let mut relation = self.compare(last, op.compared);
            if relation == Relation::Invalid && unsafe_fixes && self.extends_call(last, op.compared) {
                relation = Relation::Subset;
            }

            if matches!(relation, Relation::Subset | Relation::Equal) {
                if relation == Relation::Equal
                    && op.kind == OperandKind::Comparison
                    && chain.last().is_some_and(|prev| {
                        matches!(
                            prev.kind,
                            OperandKind::Not
                                | OperandKind::NotStrictEqualNull
                                | OperandKind::NotStrictEqualUndefined
                                | OperandKind::NotEqualBoth
                                | OperandKind::Plain
                        )
                    })
                    && chain.len() >= 2
                {
                    break;
                }
                chain.push(op);
                last_expr = Some(op.compared);
                trailing_comparison |= is_comparison_or_null_check(op.kind);
                continue;
            }

            if chain.len() >= 2 {
                break;
            }
            chain = vec![op];
            last_expr = Some(op.compared);
            trailing_comparison = op.kind == OperandKind::Comparison;
        }

        (chain, trailing_comparison)
    }

    fn or_chain_is_convertible(&self, chain: &[Operand<'t>]) -> bool {
        let unsafe_fixes = self.unsafe_fixes();
        let first = chain[0];

        let base = self.text(base_expression(first.compared));
        if chain[1..]
            .iter()
            .any(|op| self.text(base_expression(op.compared)) != base)
        {
            return false;
        }

        if !chain.iter().any(|op| is_access(unwrap_parens(op.compared)))
            || chain.iter().all(|op| op.kind == OperandKind::Plain)
        {
            return false;
        }

        let first_is_simple = !is_access(unwrap_parens(first.compared));

        if first.kind == OperandKind::Not && !unsafe_fixes {
            if first_is_simple {
                let all_guarded = chain[1..].iter().all(|op| {
                    op.kind == OperandKind::Not
                        || matches!(
                            op.kind,
                            OperandKind::NotStrictEqualNull
                                | OperandKind::NotStrictEqualUndefined
                                | OperandKind::NotEqualBoth
                                | OperandKind::TypeofCheck
                        )
                        || (op.kind == OperandKind::Comparison && self.is_or_comparison_safe(op))
                });
                if !all_guarded {
                    return false;
                }
            } else if chain[1..].iter().any(|op| !self.is_or_comparison_safe(op)) {
                return false;
            }
        }

        if !unsafe_fixes
            && matches!(
                first.kind,
                OperandKind::NotEqualBoth | OperandKind::NotStrictEqualNull | OperandKind::NotStrictEqualUndefined
            )
            && chain[1..].iter().any(|op| !self.is_or_comparison_safe(op))
        {
            return false;
        }

        if self.options.require_nullish && first.kind == OperandKind::Not {
            return false;
        }

        if first.kind == OperandKind::Plain {
            if unwrap_parens(first.compared).kind() == "meta_property" {
                return false;
            }
            if !unsafe_fixes
                && first_is_simple
                && chain[1..].iter().any(|op| op.kind == OperandKind::Comparison)
            {
                return false;
            }
        }

        if !unsafe_fixes
            && chain.iter().any(|op| {
                matches!(op.kind, OperandKind::Plain | OperandKind::Not)
                    && self.type_info(op.compared).would_change_return_type()
            })
        {
            return false;
        }

        // `!foo || foo()`: the negated callee is not a guard for the call.
        for (i, negated) in chain.iter().enumerate() {
            if negated.kind != OperandKind::Not {
                continue;
            }
            let calls_negated = chain[i + 1..].iter().any(|op| {
                let inner = unwrap_parens(op.compared);
                op.kind != OperandKind::Not
                    && is_call(inner)
                    && access_object(inner)
                        .is_some_and(|callee| self.compare(negated.compared, callee) == Relation::Equal)
            });
            if calls_negated {
                return false;
            }
        }

        true
    }

    /// Only one of `null`/`undefined` is checked on a type that may hold the
    /// other, or a strict comparison of the accessed value misses half of a
    /// type holding both.
    fn has_partial_or_check(&self, chain: &[Operand<'t>]) -> bool {
        let mut null = false;
        let mut undefined = false;
        let mut both = false;
        for op in chain {
            match op.kind {
                OperandKind::NotStrictEqualNull => null = true,
                OperandKind::NotStrictEqualUndefined | OperandKind::TypeofCheck => undefined = true,
                OperandKind::NotEqualBoth => both = true,
                _ => {}
            }
        }
        if !both && null != undefined && chain.iter().any(|op| self.strict_check_misses_other(op)) {
            return true;
        }

        chain.iter().any(|op| {
            if op.kind != OperandKind::Comparison {
                return false;
            }
            let Some((left, "===", right)) = op.binary() else {
                return false;
            };
            let checks_null = is_null(left) || is_null(right);
            let checks_undefined = is_undefined_ident(left, self.source)
                || is_undefined_ident(right, self.source)
                || is_void_expr(left)
                || is_void_expr(right);
            if !checks_null && !checks_undefined {
                return false;
            }
            let info = self.type_info(op.compared);
            info.has_null && info.has_undefined && checks_null != checks_undefined
        })
    }

    fn is_nullish_or_check(&self, op: &Operand<'t>) -> bool {
        if op.kind.is_null_check() {
            return true;
        }
        op.kind == OperandKind::Comparison
            && op.binary().is_some_and(|(left, _, right)| {
                is_null(left) || is_null(right) || is_undefined_ident(left, self.source) || is_undefined_ident(right, self.source)
            })
    }

    fn or_chain_fix(
        &self,
        chain: &[Operand<'t>],
        node: Node<'t>,
        operand_count: usize,
        trailing_comparison: bool,
    ) -> Option<Report> {
        let unsafe_fixes = self.unsafe_fixes();

        // `foo == null || foo.bar == null || foo.bar.baz` keeps the final
        // plain operand as its own disjunct.
        let mut trailing_plain = None;
        let mut optional_chain = chain;
        if chain.len() >= 3 && !unsafe_fixes {
            let last = chain[chain.len() - 1];
            let second_last = chain[chain.len() - 2];
            if last.kind == OperandKind::Plain
                && self.is_nullish_or_check(&second_last)
                && self.flatten(last.compared).len() > self.flatten(second_last.compared).len()
            {
                trailing_plain = Some(self.text(last.node));
                optional_chain = &chain[..chain.len() - 1];
            }
        }
        if optional_chain.len() == 1
            && trailing_plain.is_some()
            && self.text(optional_chain[0].compared).contains("?.")
        {
            return None;
        }

        let last = optional_chain[optional_chain.len() - 1];
        let access = if last.kind == OperandKind::Plain { last.node } else { last.compared };
        let parts = self.flatten(access);

        let checks = if last.kind == OperandKind::Plain {
            &optional_chain[..optional_chain.len() - 1]
        } else {
            optional_chain
        };
        let checked: CheckedLengths = checks
            .iter()
            .map(|op| self.flatten(op.compared).len())
            .collect();

        let call_should_be_optional = parts.last().is_some_and(|p| p.text.starts_with('('))
            && optional_chain[..optional_chain.len() - 1]
                .iter()
                .any(|op| self.flatten(op.node).len() == parts.len() - 1);

        let chain_code = build_optional_chain(&parts, &checked, call_should_be_optional, true)?;
        if chain_code.is_empty() {
            return None;
        }

        let mut code = if is_comparison_or_null_check(last.kind) {
            match last.binary() {
                Some((left, operator, right)) if last.compared.start_byte() >= right.start_byte() => {
                    format!("{chain_code} {operator} {}", self.text(left).trim())
                }
                Some((left, _, right)) => {
                    format!("{chain_code}{}", self.text_range(left.end_byte(), right.end_byte()))
                }
                None => chain_code,
            }
        } else if optional_chain[0].kind == OperandKind::Not {
            format!("!{chain_code}")
        } else {
            chain_code
        };

        if let Some(plain) = trailing_plain {
            code.push_str(" || ");
            code.push_str(plain);
        }

        let range = if chain.len() == operand_count {
            TextRange::of(node)
        } else {
            TextRange {
                start: chain[0].node.start_byte(),
                end: chain[chain.len() - 1].node.end_byte(),
            }
        };

        let last_compared = chain[chain.len() - 1].compared;
        let is_fix = unsafe_fixes
            || (!self.has_partial_or_check(chain)
                && (self.type_info(last_compared).includes_explicit_nullish() || trailing_comparison));

        trace_event!(replacement = %code, fix = is_fix, "or chain report");
        Some(Report {
            anchor: node.range(),
            edit: TextEdit::replace(range.start, range.end, code),
            kind: if is_fix { FixKind::Fix } else { FixKind::Suggestion },
        })
    }
}
