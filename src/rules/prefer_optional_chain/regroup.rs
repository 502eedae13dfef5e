//! The grammar groups `foo && foo!.bar` as `(foo && foo)!.bar`.
//!
//! TypeScript binds the postfix `!` to the right operand, so such
//! expressions are split again at their top-level `&&`/`||` tokens and each
//! operand is parsed on its own. Operands are parsed from a copy of the
//! source with everything else blanked out, so their byte offsets match the
//! original text.

use crate::rules::util::{access_object, binary_parts, first_expr_child, walk};
use crate::trace_event;
use tree_sitter::{Node, Parser, Tree};

/// A logical expression whose operands were recovered from a misgrouped tree.
pub(crate) struct RegroupedLogical<'t> {
    /// Outermost node of the original tree; spans the whole expression.
    pub top: Node<'t>,
    pub operator: &'static str,
    /// Ids of the misgrouped `&&`/`||` nodes inside `top`.
    pub logicals: Vec<usize>,
    operands: Vec<ParsedOperand>,
}

struct ParsedOperand {
    tree: Tree,
    start: usize,
    end: usize,
}

impl<'t> RegroupedLogical<'t> {
    pub(crate) fn operands(&self) -> Vec<Node<'_>> {
        self.operands
            .iter()
            .filter_map(|op| expression_in(&op.tree, op.start, op.end))
            .collect()
    }
}

/// Every misgrouped logical expression under `root`, outermost first.
pub(crate) fn regroup_logicals<'t>(root: Node<'t>, source: &str) -> Vec<RegroupedLogical<'t>> {
    let mut parser = Parser::new();
    if parser.set_language(root.language()).is_err() {
        return Vec::new();
    }
    let mut tops = Vec::new();
    walk(root, &mut |node| {
        if is_group_top(node) {
            tops.push(node);
        }
    });
    tops.into_iter()
        .filter_map(|top| regroup(top, source, &mut parser))
        .collect()
}

/// The expression a postfix `!`, member, element or call applies to.
fn postfix_inner(node: Node) -> Option<Node> {
    match node.kind() {
        "non_null_expression" => first_expr_child(node),
        _ => access_object(node),
    }
}

/// Operator of the first logical expression reached through `node`'s
/// postfix chain.
fn logical_operator(node: Node) -> Option<&'static str> {
    match binary_parts(node) {
        Some((_, op @ ("&&" | "||"), _)) => Some(op),
        Some(_) => None,
        None => postfix_inner(node).and_then(logical_operator),
    }
}

fn is_group_top(node: Node) -> bool {
    let Some(operator) = logical_operator(node) else {
        return false;
    };
    let Some(parent) = node.parent() else {
        return true;
    };
    if postfix_inner(parent).is_some_and(|inner| inner.id() == node.id()) {
        return false;
    }
    !binary_parts(parent).is_some_and(|(_, op, _)| op == operator)
}

struct Split {
    operator: &'static str,
    tokens: Vec<(usize, usize)>,
    logicals: Vec<usize>,
    through_postfix: bool,
}

fn collect_split(node: Node, postfix: bool, split: &mut Split) {
    if let Some((left, op, right)) = binary_parts(node) {
        if op != split.operator {
            return;
        }
        split.through_postfix |= postfix;
        split.logicals.push(node.id());
        collect_split(left, postfix, split);
        if let Some(token) = node.child_by_field_name("operator") {
            split.tokens.push((token.start_byte(), token.end_byte()));
        }
        collect_split(right, postfix, split);
        return;
    }
    if let Some(inner) = postfix_inner(node) {
        collect_split(inner, true, split);
    }
}

fn regroup<'t>(top: Node<'t>, source: &str, parser: &mut Parser) -> Option<RegroupedLogical<'t>> {
    let operator = logical_operator(top)?;
    let mut split = Split {
        operator,
        tokens: Vec::new(),
        logicals: Vec::new(),
        through_postfix: false,
    };
    collect_split(top, false, &mut split);
    if !split.through_postfix {
        return None;
    }

    let mut bounds = vec![top.start_byte()];
    for &(start, end) in &split.tokens {
        bounds.extend([start, end]);
    }
    bounds.push(top.end_byte());

    let mut operands = Vec::new();
    for pair in bounds.chunks_exact(2) {
        let (start, end) = trimmed(source, pair[0], pair[1])?;
        let tree = parser.parse(blank_outside(source, start, end), None)?;
        expression_in(&tree, start, end)?;
        operands.push(ParsedOperand { tree, start, end });
    }

    trace_event!(operator, operands = operands.len(), "regrouped logical expression");
    Some(RegroupedLogical {
        top,
        operator,
        logicals: split.logicals,
        operands,
    })
}

fn trimmed(source: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let text = source.get(start..end)?;
    let body = text.trim();
    if body.is_empty() {
        return None;
    }
    let lead = text.len() - text.trim_start().len();
    Some((start + lead, start + lead + body.len()))
}

/// `source` with every byte outside `start..end` replaced by a space.
/// Newlines are kept so rows stay aligned.
fn blank_outside(source: &str, start: usize, end: usize) -> Vec<u8> {
    source
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            if (start..end).contains(&i) || b == b'\n' {
                b
            } else {
                b' '
            }
        })
        .collect()
}

/// The single expression statement of an operand tree, ending at `end`.
fn expression_in(tree: &Tree, start: usize, end: usize) -> Option<Node<'_>> {
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }
    let statement = first_expr_child(root)?;
    if statement.kind() != "expression_statement" {
        return None;
    }
    let expr = first_expr_child(statement)?;
    (expr.start_byte() >= start && expr.end_byte() == end).then_some(expr)
}
