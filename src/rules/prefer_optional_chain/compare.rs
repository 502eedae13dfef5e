//! Structural comparison of two checked expressions.
//!
//! Expressions are rendered to a normalized form in which grouping
//! parentheses, type assertions, non-null assertions and `?.` tokens are
//! erased, so `(foo as Foo)!.bar` and `foo?.bar` both render as `foo.bar`.

use super::context::Analysis;
use crate::rules::util::{
    access_object, assertion_inner, call_arguments, first_expr_child, has_optional_token,
    is_access, is_call, is_function_like, is_paren, member_property, subscript_index,
    unwrap_for_comparison, unwrap_parens,
};
use tree_sitter::Node;

/// How the right expression relates to the left one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    /// Same expression.
    Equal,
    /// Right extends left (`foo` vs `foo.bar`).
    Subset,
    /// Left extends right.
    Superset,
    Invalid,
}

const SIDE_EFFECT_KINDS: &[&str] = &[
    "update_expression",
    "assignment_expression",
    "augmented_assignment_expression",
    "yield_expression",
];

/// Kinds whose every evaluation produces a fresh value.
const FRESH_VALUE_KINDS: &[&str] = &[
    "call_expression",
    "new_expression",
    "array",
    "object",
    "class",
    "jsx_element",
    "jsx_self_closing_element",
    "template_string",
    "await_expression",
];

fn has_side_effects(node: Node) -> bool {
    if SIDE_EFFECT_KINDS.contains(&node.kind()) {
        return true;
    }
    if is_paren(node) {
        return first_expr_child(node).is_some_and(has_side_effects);
    }
    if let Some(inner) = assertion_inner(node) {
        return has_side_effects(inner);
    }
    match node.kind() {
        "member_expression" | "call_expression" => access_object(node).is_some_and(has_side_effects),
        "subscript_expression" => {
            access_object(node).is_some_and(has_side_effects)
                || subscript_index(node).is_some_and(has_side_effects)
        }
        _ => false,
    }
}

/// `?.` anywhere along the access chain, looking through wrappers.
fn chain_has_optional(node: Node) -> bool {
    let node = unwrap_for_comparison(node);
    if !is_access(node) {
        return false;
    }
    has_optional_token(node) || access_object(node).is_some_and(chain_has_optional)
}

impl<'a, 't> Analysis<'a, 't> {
    /// Normalized rendering of an expression, cached per node.
    pub(crate) fn normalized(&self, node: Node<'t>) -> String {
        self.cached_normalized(node, || self.render(node))
    }

    fn render(&self, node: Node<'t>) -> String {
        let node = unwrap_for_comparison(node);
        match node.kind() {
            "member_expression" => {
                let object = access_object(node).map(|o| self.normalized(o)).unwrap_or_default();
                let property = member_property(node).map(|p| self.text(p)).unwrap_or_default();
                format!("{object}.{property}")
            }
            "subscript_expression" => {
                let object = access_object(node).map(|o| self.normalized(o)).unwrap_or_default();
                let index = subscript_index(node).map(|i| self.text(i).trim()).unwrap_or_default();
                format!("{object}[{index}]")
            }
            "call_expression" => {
                let callee = access_object(node).map(|o| self.normalized(o)).unwrap_or_default();
                let args = call_arguments(node).map(|a| self.text(a)).unwrap_or("()");
                format!("{callee}{args}")
            }
            _ => self.text(node).trim().to_string(),
        }
    }

    /// Callee text mapped to the full call text, for every call on the chain.
    fn call_signatures(&self, node: Node<'t>) -> Vec<(String, String)> {
        self.cached_signatures(node, || {
            let mut sigs = Vec::new();
            let mut current = Some(node);
            while let Some(n) = current {
                let n = unwrap_for_comparison(n);
                if is_call(n)
                    && let Some(callee) = access_object(n)
                {
                    sigs.push((self.text(callee).to_string(), self.text(n).to_string()));
                }
                current = access_object(n);
            }
            sigs
        })
    }

    fn conflicting_calls(&self, left: Node<'t>, right: Node<'t>) -> bool {
        let left_sigs = self.call_signatures(left);
        let right_sigs = self.call_signatures(right);
        left_sigs.iter().any(|(callee, full)| {
            right_sigs
                .iter()
                .any(|(other_callee, other_full)| callee == other_callee && full != other_full)
        })
    }

    /// Whether `base` appears as a real receiver somewhere on `node`'s chain.
    fn is_chain_prefix(&self, base: &str, node: Node<'t>) -> bool {
        let mut current = access_object(unwrap_for_comparison(node));
        while let Some(n) = current {
            if self.normalized(n) == base {
                return true;
            }
            current = access_object(unwrap_for_comparison(n));
        }
        false
    }

    pub(crate) fn compare(&self, left: Node<'t>, right: Node<'t>) -> Relation {
        if has_side_effects(left) || has_side_effects(right) {
            return Relation::Invalid;
        }

        let left_optional = chain_has_optional(left);
        let left_inner = unwrap_parens(left);
        if !left_optional
            && (FRESH_VALUE_KINDS.contains(&left_inner.kind()) || is_function_like(left_inner))
        {
            return Relation::Invalid;
        }

        if self.conflicting_calls(left, right) {
            return Relation::Invalid;
        }

        let left_norm = self.normalized(left);
        let right_norm = self.normalized(right);

        if left_norm == right_norm {
            let right_optional = chain_has_optional(right);
            if left_optional == right_optional {
                return Relation::Equal;
            }
            let left_is_plain = !left_norm.contains(['.', '[', '(']);
            return if left_is_plain && right_optional {
                Relation::Equal
            } else {
                Relation::Invalid
            };
        }

        if extends(&right_norm, &left_norm) && self.is_chain_prefix(&left_norm, right) {
            return Relation::Subset;
        }
        if extends(&left_norm, &right_norm) && self.is_chain_prefix(&right_norm, left) {
            return Relation::Superset;
        }
        Relation::Invalid
    }
}

/// `longer` is `shorter` followed by an access.
fn extends(longer: &str, shorter: &str) -> bool {
    longer
        .strip_prefix(shorter)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| matches!(c, '.' | '[' | '('))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::rules::prefer_optional_chain::options::PreferOptionalChainOptions;
    use crate::rules::util::walk;
    use crate::types::AnyTypes;

    /// Compares the two operands of the first `&&` in `source`.
    fn relation(source: &str) -> Relation {
        let tree = parse_source(source).expect("source should parse");
        let mut pair = None;
        walk(tree.root_node(), &mut |n| {
            if pair.is_none()
                && let Some((l, "&&", r)) = crate::rules::util::binary_parts(n)
            {
                pair = Some((l, r));
            }
        });
        let (left, right) = pair.expect("expected a && expression");
        let types = AnyTypes;
        let analysis = Analysis::new(source, PreferOptionalChainOptions::default(), &types);
        analysis.compare(left, right)
    }

    #[test]
    fn property_extension_is_subset() {
        assert_eq!(relation("foo && foo.bar;"), Relation::Subset);
        assert_eq!(relation("foo.bar && foo.bar[0]();"), Relation::Subset);
        assert_eq!(relation("foo.bar.baz && foo.bar;"), Relation::Superset);
    }

    #[test]
    fn wrappers_are_ignored() {
        assert_eq!(relation("(foo as any) && (foo!.bar);"), Relation::Subset);
        assert_eq!(relation("(foo).bar && foo.bar;"), Relation::Equal);
    }

    #[test]
    fn optional_tokens_on_identifier_are_equal() {
        assert_eq!(relation("foo && foo?.bar;"), Relation::Subset);
        assert_eq!(relation("foo.bar && foo?.bar;"), Relation::Invalid);
    }

    #[test]
    fn textual_prefix_without_structure_is_invalid() {
        assert_eq!(relation("foo && foobar.baz;"), Relation::Invalid);
        assert_eq!(relation("foo.bar && foo.barbaz;"), Relation::Invalid);
    }

    #[test]
    fn fresh_values_and_side_effects_are_invalid() {
        assert_eq!(relation("foo() && foo().bar;"), Relation::Invalid);
        assert_eq!(relation("foo[i++] && foo[i++].bar;"), Relation::Invalid);
        assert_eq!(relation("foo.bar(a) && foo.bar(b).baz;"), Relation::Invalid);
    }
}
