//! Checks deciding whether a rewrite preserves the value of the original
//! expression when the guarded base is nullish.

use super::context::Analysis;
use super::operand::{Operand, OperandKind, is_unresolved_identifier};
use crate::rules::util::{
    base_expression, binary_parts, is_access, is_literal_value, is_null, is_undefined_value,
    unwrap_parens,
};
use tree_sitter::Node;

/// The non-access side of a comparison together with the operator.
struct ComparedValue<'t> {
    operator: &'static str,
    value: Node<'t>,
}

impl<'t> ComparedValue<'t> {
    fn of(node: Node<'t>) -> Option<Self> {
        let (left, operator, right) = binary_parts(unwrap_parens(node))?;
        let (left, right) = (unwrap_parens(left), unwrap_parens(right));
        let value = if is_access(left) {
            right
        } else if is_access(right) {
            left
        } else {
            return None;
        };
        Some(Self { operator, value })
    }
}

impl<'a, 't> Analysis<'a, 't> {
    /// A loose-boolean category of the base type was switched off.
    pub(crate) fn should_skip_by_type(&self, node: Node<'t>) -> bool {
        let info = self.type_info(base_expression(node));
        let opts = &self.options;
        (info.has_any && !opts.check_any)
            || (info.big_int_like && !opts.check_big_int)
            || (info.boolean_like && !opts.check_boolean)
            || (info.number_like && !opts.check_number)
            || (info.string_like && !opts.check_string)
            || (info.has_unknown && !opts.check_unknown)
    }

    /// A strict check for one nullish value on a type that may also hold
    /// the other one.
    pub(crate) fn strict_check_misses_other(&self, op: &Operand<'t>) -> bool {
        let info = self.type_info(op.compared);
        match op.kind {
            OperandKind::NotStrictEqualNull => info.includes_undefined() || info.has_void_type(),
            OperandKind::NotStrictEqualUndefined | OperandKind::TypeofCheck => info.includes_null(),
            _ => false,
        }
    }

    /// `!foo || foo.bar OP value` keeps its value as `foo?.bar OP value`.
    pub(crate) fn is_or_comparison_safe(&self, op: &Operand<'t>) -> bool {
        if op.kind != OperandKind::Comparison {
            return true;
        }
        let Some(ComparedValue { operator, value }) = ComparedValue::of(op.node) else {
            return true;
        };
        let null = is_null(value);
        let undefined = is_undefined_value(value, self.source);
        let literal = is_literal_value(value);
        match operator {
            "!==" => literal || null,
            "===" => undefined,
            "!=" => !null && !undefined && !is_unresolved_identifier(value, self.source) && literal,
            "==" => null || undefined,
            _ => true,
        }
    }

    /// `foo && foo.bar OP value` would turn a falsy result truthy as
    /// `foo?.bar OP value`.
    pub(crate) fn and_trailing_comparison_unsafe(&self, op: &Operand<'t>) -> bool {
        let Some(ComparedValue { operator, value }) = ComparedValue::of(op.node) else {
            return false;
        };
        let null = is_null(value);
        let undefined = is_undefined_value(value, self.source);
        let unresolved = is_unresolved_identifier(value, self.source);
        match operator {
            "==" => null || undefined || unresolved,
            "===" => undefined || unresolved,
            "!=" => !(null || undefined),
            "!==" => !undefined,
            _ => false,
        }
    }
}
