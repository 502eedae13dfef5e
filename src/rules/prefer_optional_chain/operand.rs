//! Operand classification for the operands of `&&` / `||` chains.

use crate::rules::util::{
    base_expression, binary_parts, is_access, is_identifier, is_identifier_or_this,
    is_logical, is_null, is_string_literal, is_this, is_undefined_ident, is_undefined_value,
    is_void_expr, string_literal_value, unary_parts, unwrap_for_comparison, unwrap_parens,
};
use tree_sitter::Node;

/// Which boolean operator the operand belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
    And,
    Or,
}

/// A loose `!= null` is `NotEqualBoth`; there is no separate loose-null kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperandKind {
    Invalid,
    /// Bare truthiness: `foo.bar`
    Plain,
    /// `x !== null` (or `x === null` under `||`)
    NotStrictEqualNull,
    /// `x !== undefined` (or `x === undefined` under `||`)
    NotStrictEqualUndefined,
    /// `x != null` / `x != undefined` (or `==` under `||`)
    NotEqualBoth,
    /// `!x` under `||`
    Not,
    /// `!x` under `&&`; never extends a chain.
    NegatedAndOperand,
    /// `typeof x !== 'undefined'` (or `===` under `||`)
    TypeofCheck,
    /// Any other comparison whose checked side is an access.
    Comparison,
    /// `x == null` under `&&`
    EqualNull,
    /// `x === null` under `&&`
    StrictEqualNull,
    /// `x === undefined` under `&&`
    StrictEqualUndefined,
}

impl OperandKind {
    /// `!== null`, `!== undefined`, `!= null` or a `typeof` check.
    pub(crate) fn is_explicit_check(self) -> bool {
        matches!(
            self,
            OperandKind::NotStrictEqualNull
                | OperandKind::NotStrictEqualUndefined
                | OperandKind::NotEqualBoth
                | OperandKind::TypeofCheck
        )
    }

    pub(crate) fn is_strict_not_equal(self) -> bool {
        matches!(
            self,
            OperandKind::NotStrictEqualNull | OperandKind::NotStrictEqualUndefined
        )
    }

    /// Checks that assert the value *is* nullish; they invert the chain's polarity.
    pub(crate) fn is_inverted(self) -> bool {
        matches!(
            self,
            OperandKind::NegatedAndOperand
                | OperandKind::EqualNull
                | OperandKind::StrictEqualNull
                | OperandKind::StrictEqualUndefined
        )
    }

    /// Any null/undefined comparison kind.
    pub(crate) fn is_null_check(self) -> bool {
        matches!(
            self,
            OperandKind::NotStrictEqualNull
                | OperandKind::NotStrictEqualUndefined
                | OperandKind::NotEqualBoth
                | OperandKind::StrictEqualNull
                | OperandKind::EqualNull
                | OperandKind::StrictEqualUndefined
        )
    }
}

/// One classified operand of a logical chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Operand<'t> {
    pub kind: OperandKind,
    /// The operand as written, parentheses included.
    pub node: Node<'t>,
    /// The expression the operand tests. For `Invalid` operands this is the
    /// operand node itself.
    pub compared: Node<'t>,
}

impl<'t> Operand<'t> {
    fn new(kind: OperandKind, node: Node<'t>, compared: Node<'t>) -> Self {
        Self {
            kind,
            node,
            compared,
        }
    }

    fn invalid(node: Node<'t>) -> Self {
        Self::new(OperandKind::Invalid, node, node)
    }

    /// The operand with parentheses stripped, when it is a binary expression.
    pub(crate) fn binary(&self) -> Option<(Node<'t>, &'static str, Node<'t>)> {
        binary_parts(unwrap_parens(self.node))
    }
}

/// Splits a null/undefined/void/string comparison into `(checked, value)`,
/// trying the conventional order before the Yoda order.
fn split_value_side<'t>(
    left: Node<'t>,
    right: Node<'t>,
    source: &str,
) -> Option<(Node<'t>, Node<'t>)> {
    let is_value =
        |n: Node<'t>| is_null(n) || is_undefined_ident(n, source) || is_void_expr(n) || is_string_literal(n);
    if is_value(right) {
        Some((left, right))
    } else if is_value(left) {
        Some((right, left))
    } else {
        None
    }
}

pub(crate) fn classify<'t>(node: Node<'t>, op: LogicalOp, source: &str) -> Operand<'t> {
    let is_and = op == LogicalOp::And;
    let unwrapped = unwrap_for_comparison(node);

    if is_this(unwrapped) {
        return Operand::invalid(node);
    }

    // A nested logical expression at the root of an access chain is opaque.
    let base = base_expression(unwrapped);
    if is_logical(base, "&&") || is_logical(base, "||") {
        return Operand::invalid(node);
    }

    if let Some((left, operator, right)) = binary_parts(unwrapped) {
        if let Some((expr, value)) = split_value_side(left, right, source) {
            let expr = unwrap_parens(expr);

            if let Some(("typeof", argument)) = unary_parts(expr)
                && string_literal_value(source, value) == Some("undefined")
            {
                let matches_polarity = match operator {
                    "!==" | "!=" => is_and,
                    "===" | "==" => !is_and,
                    _ => false,
                };
                if matches_polarity {
                    return Operand::new(OperandKind::TypeofCheck, node, argument);
                }
            }

            let null = is_null(value);
            let undefined = is_undefined_value(value, source);
            let simple = is_identifier_or_this(expr);

            if is_and {
                let kind = match operator {
                    "!==" if null => Some(OperandKind::NotStrictEqualNull),
                    "!==" if undefined => Some(OperandKind::NotStrictEqualUndefined),
                    "!=" if null || undefined => Some(OperandKind::NotEqualBoth),
                    "===" if null && simple => Some(OperandKind::StrictEqualNull),
                    "===" if undefined && simple => Some(OperandKind::StrictEqualUndefined),
                    "==" if (null || undefined) && simple => Some(OperandKind::EqualNull),
                    _ => None,
                };
                if let Some(kind) = kind {
                    return Operand::new(kind, node, expr);
                }
            } else if is_access(expr) {
                if null || undefined {
                    return Operand::new(OperandKind::Comparison, node, expr);
                }
            } else {
                let kind = match operator {
                    "===" if null => Some(OperandKind::NotStrictEqualNull),
                    "===" if undefined => Some(OperandKind::NotStrictEqualUndefined),
                    "==" if null || undefined => Some(OperandKind::NotEqualBoth),
                    _ => None,
                };
                if let Some(kind) = kind {
                    return Operand::new(kind, node, expr);
                }
            }
        }
    }

    if let Some(("!", argument)) = unary_parts(unwrapped) {
        if is_this(argument) {
            return Operand::invalid(node);
        }
        let kind = if is_and {
            OperandKind::NegatedAndOperand
        } else {
            OperandKind::Not
        };
        return Operand::new(kind, node, argument);
    }

    // Remaining binaries: the checked side is whichever side is an access.
    if let Some((left, _, right)) = binary_parts(unwrapped) {
        let right_inner = unwrap_parens(right);
        let (compared, has_access) = if is_access(right) {
            (right_inner, true)
        } else {
            let left = unwrap_parens(left);
            (left, is_access(left))
        };
        if is_and && !has_access {
            return Operand::invalid(node);
        }
        return Operand::new(OperandKind::Comparison, node, compared);
    }

    Operand::new(OperandKind::Plain, node, unwrapped)
}

/// Identifier (not `undefined`) used as a comparison value: its runtime value is unknown.
pub(crate) fn is_unresolved_identifier(node: Node, source: &str) -> bool {
    is_identifier(node) && !is_undefined_ident(node, source)
}
