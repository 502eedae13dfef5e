//! `foo && foo.bar && foo.bar.baz` → `foo?.bar?.baz`

use super::compare::Relation;
use super::context::{Analysis, FixKind, Report, TextRange};
use super::fixgen::{CheckedLengths, build_optional_chain};
use super::operand::{LogicalOp, Operand, OperandKind, classify};
use crate::fix::TextEdit;
use crate::rules::util::{
    access_object, base_expression, binary_parts, contains_optional_chain, is_access, is_call,
    is_inside_jsx, is_logical, is_subscript, unwrap_parens,
};
use crate::trace_event;
use std::collections::HashSet;
use tree_sitter::Node;

/// Accumulates candidate chains while walking the operands left to right.
struct AndScan<'t> {
    chains: Vec<Vec<Operand<'t>>>,
    current: Vec<Operand<'t>>,
    last_expr: Option<Node<'t>>,
    /// Kind of the most recent non-plain operand in the current chain.
    last_check: OperandKind,
    /// The current chain accepts no further operands.
    complete: bool,
    /// Stop scanning; only the first chain is reported.
    stopped: bool,
    /// The chain was extended through a call under unsafe fixes.
    through_call: bool,
}

impl<'t> AndScan<'t> {
    fn new() -> Self {
        Self {
            chains: Vec::new(),
            current: Vec::new(),
            last_expr: None,
            last_check: OperandKind::Invalid,
            complete: false,
            stopped: false,
            through_call: false,
        }
    }

    fn flush(&mut self) {
        let chain = std::mem::take(&mut self.current);
        if chain.len() >= 2 {
            self.chains.push(chain);
        }
    }

    fn start(&mut self, op: Operand<'t>) {
        self.current = vec![op];
        self.last_expr = Some(op.compared);
        self.last_check = if op.kind == OperandKind::Plain {
            OperandKind::Invalid
        } else {
            op.kind
        };
        self.complete = false;
    }

    fn reset(&mut self) {
        self.current.clear();
        self.last_expr = None;
        self.last_check = OperandKind::Invalid;
        self.complete = false;
        self.through_call = false;
    }

    fn push(&mut self, op: Operand<'t>) {
        self.current.push(op);
        if op.kind != OperandKind::Plain {
            self.last_check = op.kind;
        }
    }

    /// Finish scanning: returns the chains worth validating.
    fn finish(mut self) -> Vec<Vec<Operand<'t>>> {
        if self.current.len() >= 2 && !(self.stopped && !self.complete) {
            let chain = std::mem::take(&mut self.current);
            self.chains.push(chain);
        }
        if self.stopped {
            self.chains.truncate(1);
        }
        self.chains
    }
}

/// Flattens nested `&&` (looking through parentheses) into its operands.
fn collect_operands<'t>(node: Node<'t>, logicals: &mut Vec<Node<'t>>, out: &mut Vec<Node<'t>>) {
    let inner = unwrap_parens(node);
    match binary_parts(inner) {
        Some((left, "&&", right)) => {
            logicals.push(node);
            logicals.push(inner);
            collect_operands(left, logicals, out);
            collect_operands(right, logicals, out);
        }
        _ => out.push(node),
    }
}

impl<'a, 't> Analysis<'a, 't> {
    pub(crate) fn check_and_chain(&mut self, node: Node<'t>) {
        if !is_logical(node, "&&") || self.seen_and.contains(&node.id()) {
            return;
        }
        let mut logicals = Vec::new();
        let mut operand_nodes = Vec::new();
        collect_operands(node, &mut logicals, &mut operand_nodes);
        self.seen_and.extend(logicals.iter().map(|n| n.id()));
        self.check_and_operands(node, &operand_nodes);
    }

    /// `node` spans the whole `&&` expression made of `operand_nodes`.
    pub(crate) fn check_and_operands(&mut self, node: Node<'t>, operand_nodes: &[Node<'t>]) {
        if is_inside_jsx(node) {
            return;
        }
        let range = TextRange::of(node);
        if self.processed_and.iter().any(|r| r.overlaps(&range)) {
            return;
        }
        self.processed_and.push(range);
        if operand_nodes.len() < 2 {
            return;
        }

        let operands: Vec<Operand<'t>> = operand_nodes
            .iter()
            .map(|&n| classify(n, LogicalOp::And, self.source))
            .collect();

        let chains = self.scan_and_operands(&operands);
        if chains.is_empty() {
            return;
        }
        let chains = self.select_and_chains(chains);

        for chain in chains {
            if !self.and_chain_is_convertible(&chain) {
                continue;
            }
            let Some(report) = self.and_chain_fix(&chain, node, operand_nodes.len()) else {
                return;
            };
            self.push_report(report);
            self.mark_reported(chain.iter().map(|op| op.node));
        }
    }

    fn scan_and_operands(&self, operands: &[Operand<'t>]) -> Vec<Vec<Operand<'t>>> {
        let unsafe_fixes = self.unsafe_fixes();
        let mut scan = AndScan::new();
        let mut i = 0;

        while i < operands.len() && !scan.stopped {
            let op = operands[i];
            i += 1;
            trace_event!(kind = ?op.kind, operand = self.text(op.compared), "and operand");

            if op.kind == OperandKind::Invalid {
                scan.flush();
                scan.reset();
                continue;
            }
            let (Some(last_expr), Some(&prev)) = (scan.last_expr, scan.current.last()) else {
                scan.start(op);
                scan.through_call = false;
                continue;
            };
            if scan.complete {
                scan.flush();
                scan.start(op);
                scan.through_call = false;
                continue;
            }

            let mut relation = self.compare(last_expr, op.compared);

            if self.strict_check_blocks_extension(&prev) {
                scan.flush();
                scan.complete = true;
                scan.stopped = true;
                break;
            }

            let mut used_call_extension = false;
            if relation == Relation::Invalid && unsafe_fixes && self.extends_call(last_expr, op.compared) {
                relation = Relation::Subset;
                used_call_extension = true;
                scan.through_call = true;
            }

            match relation {
                Relation::Equal => {
                    if op.kind.is_explicit_check() {
                        if scan.last_check == OperandKind::NotEqualBoth && op.kind.is_strict_not_equal() {
                            scan.push(op);
                            continue;
                        }
                        let complementary = (matches!(
                            scan.last_check,
                            OperandKind::NotStrictEqualUndefined | OperandKind::TypeofCheck
                        ) && op.kind == OperandKind::NotStrictEqualNull)
                            || (scan.last_check == OperandKind::NotStrictEqualNull
                                && matches!(
                                    op.kind,
                                    OperandKind::NotStrictEqualUndefined | OperandKind::TypeofCheck
                                ));
                        if complementary {
                            let extended_next = operands
                                .get(i)
                                .is_some_and(|next| self.compare(op.compared, next.compared) == Relation::Subset);
                            if !extended_next {
                                scan.complete = true;
                                scan.stopped = true;
                                continue;
                            }
                        }
                        scan.push(op);
                        continue;
                    }
                    if op.kind == OperandKind::Plain {
                        // A repeated plain access is dropped; after a null check it is the access itself.
                        if prev.kind.is_explicit_check() {
                            scan.current.push(op);
                        }
                        continue;
                    }
                    if op.kind == OperandKind::Comparison && prev.kind.is_explicit_check() {
                        scan.current.push(op);
                        scan.complete = true;
                        continue;
                    }
                }
                Relation::Subset => {
                    if op.kind.is_explicit_check()
                        && scan.current.len() >= 2
                        && self.call_chain_needs_stop(&scan, &op, last_expr, used_call_extension)
                    {
                        scan.flush();
                        scan.complete = true;
                        scan.stopped = true;
                        continue;
                    }

                    if prev.kind.is_inverted() {
                        scan.reset();
                        continue;
                    }

                    if self.strict_check_ends_chain(&scan.current, &op)
                        && matches!(op.kind, OperandKind::Plain | OperandKind::Comparison)
                    {
                        scan.flush();
                        scan.complete = true;
                        scan.stopped = true;
                        break;
                    }

                    scan.push(op);
                    scan.last_expr = Some(op.compared);

                    if !unsafe_fixes
                        && op.kind.is_strict_not_equal()
                        && scan.current[..scan.current.len() - 1]
                            .iter()
                            .any(|p| p.kind.is_strict_not_equal() && self.strict_check_is_incomplete(p.compared))
                    {
                        scan.complete = true;
                    }
                    continue;
                }
                Relation::Superset | Relation::Invalid => {}
            }

            scan.flush();
            scan.start(op);
        }

        scan.finish()
    }

    /// The type has both `null` and `undefined`, so a single strict check misses one.
    fn strict_check_is_incomplete(&self, node: Node<'t>) -> bool {
        let info = self.type_info(node);
        !info.is_any_or_unknown() && info.includes_null() && info.includes_undefined()
    }

    /// A strict check on a call or element result that is incomplete, or
    /// that tests for a value the type cannot hold, pins the chain.
    fn strict_check_blocks_extension(&self, prev: &Operand<'t>) -> bool {
        if !prev.kind.is_strict_not_equal() {
            return false;
        }
        let inner = unwrap_parens(prev.compared);
        let call_like = is_call(inner) || inner.kind() == "new_expression";
        if !call_like && !is_subscript(inner) {
            return false;
        }
        let info = self.type_info(prev.compared);
        let incomplete = !info.is_any_or_unknown() && info.includes_null() && info.includes_undefined();
        let mismatched = !info.is_any_or_unknown() && !info.includes_null() && !info.includes_undefined();
        if call_like {
            incomplete || mismatched
        } else {
            mismatched || (incomplete && !self.unsafe_fixes())
        }
    }

    /// `last` is a call and `next` textually continues it.
    pub(super) fn extends_call(&self, last: Node<'t>, next: Node<'t>) -> bool {
        let inner = unwrap_parens(last);
        if !is_call(inner) && inner.kind() != "new_expression" {
            return false;
        }
        self.text(next)
            .strip_prefix(self.text(last))
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| matches!(c, '.' | '[' | '('))
    }

    /// An explicit check after earlier explicit checks in a chain that
    /// contains calls ends scanning, unless the call is the checked callee.
    fn call_chain_needs_stop(
        &self,
        scan: &AndScan<'t>,
        op: &Operand<'t>,
        last_expr: Node<'t>,
        used_call_extension: bool,
    ) -> bool {
        let has_explicit = scan.current.iter().any(|c| c.kind.is_explicit_check());
        let op_inner = unwrap_parens(op.compared);
        let mut has_call = is_call(op_inner);
        let calls_checked = has_call
            && access_object(op_inner).is_some_and(|callee| self.text(callee) == self.text(last_expr));
        if !has_call {
            has_call = scan
                .current
                .iter()
                .any(|c| is_call(unwrap_parens(c.compared)));
        }
        has_explicit && has_call && !used_call_extension && !scan.through_call && !calls_checked
    }

    /// After a strict single-sided check, decide whether the chain must end
    /// there, leaving the check as a trailing comparison.
    fn strict_check_ends_chain(&self, current: &[Operand<'t>], op: &Operand<'t>) -> bool {
        let Some(last) = current.last() else {
            return false;
        };
        let strict = matches!(
            last.kind,
            OperandKind::NotStrictEqualUndefined | OperandKind::TypeofCheck | OperandKind::NotStrictEqualNull
        );
        if !strict {
            return false;
        }

        // A call result checked strictly can only be chained through when the
        // call is already optional or its callee was checked earlier.
        let inner = unwrap_parens(last.compared);
        if is_call(inner) && !self.text(last.compared).contains("?.") {
            let callee_checked = access_object(inner).is_some_and(|callee| {
                let callee_text = self.text(callee);
                current[..current.len() - 1]
                    .iter()
                    .any(|p| self.text(p.compared) == callee_text)
            });
            if !callee_checked {
                return true;
            }
        }

        let strict_count = current.iter().filter(|c| c.kind.is_strict_not_equal()).count();
        if !self.unsafe_fixes()
            && strict_count >= 1
            && op.kind.is_strict_not_equal()
            && self.strict_check_is_incomplete(last.compared)
        {
            return true;
        }

        // Truthiness on a parent followed by a strict check is inconsistent.
        if current[..current.len() - 1]
            .iter()
            .any(|p| p.kind == OperandKind::Plain && self.compare(p.compared, last.compared) == Relation::Subset)
        {
            return true;
        }

        !self.unsafe_fixes()
            && current.len() >= 2
            && op.kind != OperandKind::TypeofCheck
            && last.kind == OperandKind::TypeofCheck
    }

    /// Drops chains that are shadowed by longer overlapping ones, and all of
    /// them when plain chains start from different bases.
    fn select_and_chains(&self, chains: Vec<Vec<Operand<'t>>>) -> Vec<Vec<Operand<'t>>> {
        if chains.len() <= 1 {
            return chains;
        }

        if !self.unsafe_fixes() {
            let all_plain = chains
                .iter()
                .flatten()
                .all(|op| op.kind == OperandKind::Plain);
            if all_plain {
                let bases: HashSet<&str> = chains
                    .iter()
                    .filter_map(|chain| chain.first())
                    .map(|op| self.text(base_expression(op.compared)))
                    .collect();
                if bases.len() > 1 {
                    return Vec::new();
                }
            }
        }

        let spans: Vec<(TextRange, usize)> = chains.iter().map(|chain| (chain_span(chain), chain.len())).collect();
        chains
            .into_iter()
            .enumerate()
            .filter(|(i, _)| {
                let (span, len) = spans[*i];
                !spans
                    .iter()
                    .enumerate()
                    .any(|(j, (other, other_len))| j != *i && span.overlaps(other) && *other_len > len)
            })
            .map(|(_, chain)| chain)
            .collect()
    }

    fn and_chain_is_convertible(&self, chain: &[Operand<'t>]) -> bool {
        let unsafe_fixes = self.unsafe_fixes();
        if chain.len() < 2
            || chain
                .iter()
                .any(|op| self.overlaps_reported(TextRange::of(op.node)))
        {
            return false;
        }

        let first = chain[0];
        if (first.kind == OperandKind::Plain || first.kind.is_strict_not_equal())
            && contains_optional_chain(first.compared)
        {
            return false;
        }

        if !chain.iter().any(|op| is_access(unwrap_parens(op.compared))) {
            return false;
        }

        let first_parts = self.flatten(first.compared);
        let same_expression = chain[1..].iter().all(|op| {
            let parts = self.flatten(op.compared);
            parts.len() == first_parts.len()
                && parts.iter().zip(&first_parts).all(|(a, b)| a.text == b.text)
        });
        if same_expression {
            return false;
        }

        if chain.len() == 2 && self.already_optimal(chain[0], chain[1]) {
            trace_event!("and chain already optimal");
            return false;
        }

        if self.options.require_nullish {
            let last = chain.len() - 1;
            let nullish_context = chain.iter().enumerate().any(|(i, op)| {
                op.kind != OperandKind::Plain
                    || (i < last && self.type_info(op.compared).includes_explicit_nullish())
            });
            if !nullish_context {
                return false;
            }
        }

        if first.kind == OperandKind::Plain && self.type_info(first.compared).has_void_type() {
            return false;
        }

        if !unsafe_fixes && chain.iter().any(|op| op.node.kind() == "non_null_expression") {
            return false;
        }

        let last = chain[chain.len() - 1];
        for (i, op) in chain.iter().enumerate() {
            if op.kind == OperandKind::Plain {
                if self.should_skip_by_type(op.compared) {
                    return false;
                }
                if i == 0 && !unsafe_fixes && self.type_info(op.compared).would_change_return_type() {
                    return false;
                }
            }
            if op.kind == OperandKind::TypeofCheck
                && !self.type_info(op.compared).includes_nullish()
                && is_call(unwrap_parens(last.compared))
            {
                return false;
            }
        }

        if !unsafe_fixes && self.is_trailing_comparison(chain) && self.and_trailing_comparison_unsafe(&last) {
            return false;
        }

        true
    }

    /// `x && x.y?.z`: the extension already carries its own `?.`.
    fn already_optimal(&self, first: Operand<'t>, second: Operand<'t>) -> bool {
        if !contains_optional_chain(second.compared) {
            return false;
        }
        let first_parts = self.flatten(first.node);
        let second_parts = self.flatten(second.node);

        // `foo && foo?.()` is a redundant guard, not an optimal chain.
        let redundant = second_parts.len() == first_parts.len() + 1
            && first_parts
                .iter()
                .zip(&second_parts)
                .all(|(a, b)| a.text == b.text && a.optional == b.optional)
            && second_parts.last().is_some_and(|p| p.optional);
        if redundant {
            return false;
        }

        second_parts.len() > first_parts.len()
            && !first_parts.is_empty()
            && first_parts.iter().zip(&second_parts).all(|(a, b)| a.text == b.text)
            && second_parts[first_parts.len()..].iter().any(|p| p.optional)
    }

    /// Only `!== null` or only `!== undefined` guards, and the guarded type
    /// may still hold the value left unchecked.
    fn has_partial_nullish_guard(&self, chain: &[Operand<'t>]) -> bool {
        let last = chain[chain.len() - 1];
        let prev = chain[chain.len() - 2];
        let exclude_last = match last.kind {
            OperandKind::NotStrictEqualNull
            | OperandKind::NotStrictEqualUndefined
            | OperandKind::NotEqualBoth
            | OperandKind::Comparison => true,
            OperandKind::Plain => self.flatten(last.compared).len() > self.flatten(prev.compared).len(),
            _ => false,
        };
        let guards = if exclude_last { &chain[..chain.len() - 1] } else { chain };

        let mut null = false;
        let mut undefined = false;
        for op in guards {
            match op.kind {
                OperandKind::Plain | OperandKind::NotEqualBoth | OperandKind::TypeofCheck => return false,
                OperandKind::NotStrictEqualNull => null = true,
                OperandKind::NotStrictEqualUndefined => undefined = true,
                _ => {}
            }
        }
        null != undefined && guards.iter().any(|op| self.strict_check_misses_other(op))
    }

    /// The last operand compares the accessed value rather than guarding it.
    fn is_trailing_comparison(&self, chain: &[Operand<'t>]) -> bool {
        let last = chain[chain.len() - 1];
        match last.kind {
            OperandKind::Comparison => true,
            OperandKind::NotStrictEqualNull | OperandKind::NotStrictEqualUndefined | OperandKind::NotEqualBoth => {
                let prev = chain[chain.len() - 2];
                self.flatten(last.compared).len() > self.flatten(prev.compared).len()
            }
            _ => false,
        }
    }

    fn and_chain_fix(&self, chain: &[Operand<'t>], node: Node<'t>, operand_count: usize) -> Option<Report> {
        let last = chain[chain.len() - 1];
        let (access, trailing, trailing_typeof) = match last.kind {
            OperandKind::Plain => (last.node, false, false),
            OperandKind::Comparison
            | OperandKind::NotStrictEqualNull
            | OperandKind::NotStrictEqualUndefined
            | OperandKind::NotEqualBoth => (last.compared, true, false),
            OperandKind::TypeofCheck => (last.compared, true, true),
            _ => (last.compared, false, false),
        };

        let mut parts = self.flatten(access);

        // `(foo as T | null) && (foo as T).bar` keeps the fuller assertion.
        if chain[0].kind == OperandKind::Plain && !parts.is_empty() {
            let first_parts = self.flatten(chain[0].node);
            if first_parts.len() == 1 && first_parts[0].text.len() > parts[0].text.len() {
                parts[0] = first_parts[0].clone();
            }
        }

        let checks: Vec<Operand<'t>> = chain
            .iter()
            .enumerate()
            .filter(|(i, op)| !(*i == chain.len() - 1 && op.kind == OperandKind::Plain))
            .map(|(_, op)| *op)
            .collect();

        let mut checked: CheckedLengths = checks
            .iter()
            .map(|op| self.flatten(op.compared).len())
            .collect();

        // A single guard on the base makes every intermediate access optional.
        if checked.len() == 1 && checked.first() == Some(&1) {
            let fill_up_to = if last.kind == OperandKind::Plain {
                let last_parts = self.flatten(last.node);
                let mut upto = last_parts.len().saturating_sub(1);
                if upto > 0 && last_parts.last().is_some_and(|p| p.is_call()) {
                    upto -= 1;
                }
                upto
            } else {
                1
            };
            checked.extend(1..=fill_up_to);
        }

        // Reuse the longest checked prefix so its `!` and `?.` survive.
        if !checks.is_empty() && parts.len() > 1 {
            let mut best = Vec::new();
            for op in &checks {
                let expr = if op.kind == OperandKind::Plain { op.node } else { op.compared };
                let op_parts = self.flatten(expr);
                if op_parts.len() < parts.len()
                    && op_parts.len() > best.len()
                    && op_parts
                        .iter()
                        .zip(&parts)
                        .all(|(a, b)| a.text.trim_end_matches('!') == b.text.trim_end_matches('!'))
                {
                    best = op_parts;
                }
            }
            for (part, prefix) in parts.iter_mut().zip(best) {
                part.text = prefix.text;
                part.has_non_null = prefix.has_non_null;
                part.optional = prefix.optional;
            }
        }

        let call_should_be_optional = parts.last().is_some_and(|p| p.text.starts_with('('))
            && chain[..chain.len() - 1]
                .iter()
                .any(|op| self.flatten(op.compared).len() == parts.len() - 1);

        let mut code = build_optional_chain(&parts, &checked, call_should_be_optional, false)?;

        let trivia: String = chain[1..].iter().map(|op| self.leading_trivia(op.node)).collect();
        let trivia = trivia.trim_start();
        if !trivia.is_empty() {
            code = format!("{trivia}{code}");
        }

        if trailing && let Some((left, _, right)) = last.binary() {
            let binary = unwrap_parens(last.node);
            let compared = last.compared;
            if trailing_typeof {
                let prefix = self.text_range(left.start_byte(), compared.start_byte());
                let suffix = self.text_range(compared.end_byte(), binary.end_byte());
                code = format!("{prefix}{code}{suffix}");
            } else if compared.start_byte() >= right.start_byte() {
                let prefix = self.text_range(binary.start_byte(), right.start_byte());
                code = format!("{prefix}{code}");
            } else {
                let suffix = self.text_range(left.end_byte(), binary.end_byte());
                code.push_str(suffix);
            }
        }

        let range = if chain.len() == operand_count {
            TextRange::of(node)
        } else {
            TextRange {
                start: chain[0].node.start_byte(),
                end: last.node.end_byte(),
            }
        };

        let explicit_nullish = |n: Node<'t>| self.type_info(n).includes_explicit_nullish();
        // `foo !== null && foo.bar` on a type that cannot be any/unknown.
        let checked_head = chain[0].kind.is_explicit_check()
            && last.kind == OperandKind::Plain
            && !self.type_info(chain[0].compared).is_any_or_unknown();
        let is_fix = self.unsafe_fixes()
            || (!self.has_partial_nullish_guard(chain)
                && (explicit_nullish(last.compared)
                    || (chain.len() > 2 && chain[..chain.len() - 1].iter().all(|op| explicit_nullish(op.compared)))
                    || checked_head
                    || trailing
                    || chain.iter().any(|op| op.kind == OperandKind::TypeofCheck)));

        trace_event!(replacement = %code, fix = is_fix, "and chain report");
        Some(Report {
            anchor: node.range(),
            edit: TextEdit::replace(range.start, range.end, code),
            kind: if is_fix { FixKind::Fix } else { FixKind::Suggestion },
        })
    }

    /// Comments between an operand and the operator before it.
    fn leading_trivia(&self, node: Node<'t>) -> &'t str {
        let mut prev = node.prev_sibling();
        while let Some(p) = prev {
            if p.kind() != "comment" {
                break;
            }
            prev = p.prev_sibling();
        }
        match prev {
            Some(p) => self.text_range(p.end_byte(), node.start_byte()),
            None => "",
        }
    }
}

fn chain_span(chain: &[Operand]) -> TextRange {
    match (chain.first(), chain.last()) {
        (Some(first), Some(last)) => TextRange {
            start: first.node.start_byte(),
            end: last.node.end_byte(),
        },
        _ => TextRange { start: 0, end: 0 },
    }
}
