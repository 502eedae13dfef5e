//! Decomposition of access chains into parts and reassembly as optional chains.

use super::context::Analysis;
use crate::rules::util::{
    access_object, call_arguments, call_type_arguments, first_expr_child, has_optional_token,
    is_identifier, member_property, subscript_index,
};
use std::collections::BTreeSet;
use tree_sitter::Node;

/// One link of an access chain: the base, `.name`, `[index]` or `(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChainPart {
    /// Text without its leading separator; `!` appended when asserted.
    pub text: String,
    /// Written with `?.` in the source.
    pub optional: bool,
    /// Needs a `.` when it is not made optional.
    pub requires_dot: bool,
    pub is_private: bool,
    pub has_non_null: bool,
}

impl ChainPart {
    fn new(text: String) -> Self {
        Self {
            text,
            optional: false,
            requires_dot: false,
            is_private: false,
            has_non_null: false,
        }
    }

    pub(crate) fn is_call(&self) -> bool {
        self.text.starts_with('(') || self.text.starts_with('<')
    }
}

/// Depth of each check, counted in parts.
pub(crate) type CheckedLengths = BTreeSet<usize>;

impl<'a, 't> Analysis<'a, 't> {
    /// Splits an access chain into parts, cached per node.
    pub(crate) fn flatten(&self, node: Node<'t>) -> Vec<ChainPart> {
        self.cached_flattened(node, || {
            let mut parts = Vec::new();
            self.flatten_into(node, false, &mut parts);
            parts
        })
    }

    fn flatten_into(&self, node: Node<'t>, non_null: bool, parts: &mut Vec<ChainPart>) {
        match node.kind() {
            "parenthesized_expression" => {
                let Some(inner) = first_expr_child(node) else {
                    parts.push(ChainPart::new(self.text(node).to_string()));
                    return;
                };
                if matches!(inner.kind(), "await_expression" | "yield_expression") {
                    parts.push(ChainPart::new(self.text(node).to_string()));
                } else {
                    self.flatten_into(inner, non_null, parts);
                }
            }
            "non_null_expression" => match first_expr_child(node) {
                Some(inner) => self.flatten_into(inner, true, parts),
                None => parts.push(ChainPart::new(self.text(node).to_string())),
            },
            "member_expression" => {
                if let Some(object) = access_object(node) {
                    self.flatten_into(object, false, parts);
                }
                let property = member_property(node);
                let mut text = property.map(|p| self.text(p)).unwrap_or_default().to_string();
                if non_null {
                    text.push('!');
                }
                parts.push(ChainPart {
                    text,
                    optional: has_optional_token(node),
                    requires_dot: true,
                    is_private: property.is_some_and(|p| p.kind() == "private_property_identifier"),
                    has_non_null: non_null,
                });
            }
            "subscript_expression" => {
                if let Some(object) = access_object(node) {
                    self.flatten_into(object, false, parts);
                }
                let index = subscript_index(node).map(|i| self.text(i)).unwrap_or_default();
                let suffix = if non_null { "!" } else { "" };
                parts.push(ChainPart {
                    text: format!("[{index}]{suffix}"),
                    optional: has_optional_token(node),
                    requires_dot: false,
                    is_private: false,
                    has_non_null: non_null,
                });
            }
            "call_expression" => {
                if let Some(callee) = access_object(node) {
                    self.flatten_into(callee, false, parts);
                }
                let type_args = call_type_arguments(node).map(|t| self.text(t)).unwrap_or_default();
                let args = call_arguments(node).map(|a| self.text(a)).unwrap_or("()");
                parts.push(ChainPart {
                    text: format!("{type_args}{args}"),
                    optional: has_optional_token(node),
                    requires_dot: false,
                    is_private: false,
                    has_non_null: false,
                });
            }
            _ => {
                let mut text = self.text(node).trim().to_string();
                if non_null && is_identifier(node) {
                    text.push('!');
                }
                if matches!(node.kind(), "as_expression" | "type_assertion") {
                    text = format!("({text})");
                }
                parts.push(ChainPart::new(text));
            }
        }
    }
}

/// Reassembles `parts`, inserting `?.` after every checked depth.
///
/// Returns `None` when the result would need `?.#private`, which is not
/// valid syntax.
pub(crate) fn build_optional_chain(
    parts: &[ChainPart],
    checked: &CheckedLengths,
    call_should_be_optional: bool,
    strip_non_null: bool,
) -> Option<String> {
    let max_checked = checked.iter().next_back().copied().unwrap_or(0);
    let last = parts.len().saturating_sub(1);

    let mut optional = vec![false; parts.len()];
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            optional[i] = checked.contains(&i)
                || part.optional
                || (part.is_call() && i == last && call_should_be_optional);
        }
        if optional[i] && part.is_private {
            return None;
        }
    }

    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        let mut text = part.text.as_str();
        if strip_non_null
            && i < last
            && optional[i + 1]
            && part.has_non_null
            && i < max_checked
        {
            text = text.strip_suffix('!').unwrap_or(text);
        }
        if i > 0 {
            if optional[i] || (part.optional && i > max_checked) {
                out.push_str("?.");
            } else if part.requires_dot {
                out.push('.');
            }
        }
        out.push_str(text);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::rules::prefer_optional_chain::options::PreferOptionalChainOptions;
    use crate::types::AnyTypes;

    fn parts_of(source: &str) -> Vec<ChainPart> {
        let tree = parse_source(source).expect("source should parse");
        let expr = tree
            .root_node()
            .named_child(0)
            .and_then(|stmt| stmt.named_child(0))
            .expect("expected an expression statement");
        let types = AnyTypes;
        let analysis = Analysis::new(source, PreferOptionalChainOptions::default(), &types);
        analysis.flatten(expr)
    }

    fn texts(parts: &[ChainPart]) -> Vec<&str> {
        parts.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn flattens_members_elements_and_calls() {
        let parts = parts_of("foo.bar[0]?.baz<T>(a, b);");
        assert_eq!(texts(&parts), ["foo", "bar", "[0]", "baz", "<T>(a, b)"]);
        assert!(parts[1].requires_dot);
        assert!(parts[3].optional);
        assert!(!parts[2].requires_dot);
    }

    #[test]
    fn keeps_non_null_and_assertion_wrappers() {
        let parts = parts_of("(foo as any)!.bar!.baz;");
        assert_eq!(texts(&parts), ["(foo as any)", "bar!", "baz"]);
        assert!(parts[1].has_non_null);
        let parts = parts_of("(await foo).bar;");
        assert_eq!(texts(&parts), ["(await foo)", "bar"]);
    }

    #[test]
    fn builds_checked_depths_as_optional() {
        let parts = parts_of("foo.bar.baz;");
        let checked: CheckedLengths = [1, 2].into_iter().collect();
        assert_eq!(
            build_optional_chain(&parts, &checked, false, false).as_deref(),
            Some("foo?.bar?.baz")
        );
        let checked: CheckedLengths = [1].into_iter().collect();
        assert_eq!(
            build_optional_chain(&parts, &checked, false, false).as_deref(),
            Some("foo?.bar.baz")
        );
    }

    #[test]
    fn optional_call_only_when_callee_checked() {
        let parts = parts_of("foo.bar();");
        let checked: CheckedLengths = [1].into_iter().collect();
        assert_eq!(
            build_optional_chain(&parts, &checked, true, false).as_deref(),
            Some("foo?.bar?.()")
        );
        assert_eq!(
            build_optional_chain(&parts, &checked, false, false).as_deref(),
            Some("foo?.bar()")
        );
    }

    #[test]
    fn strips_asserted_parts_in_checked_region() {
        let parts = parts_of("foo!.bar!.baz;");
        let checked: CheckedLengths = [2].into_iter().collect();
        assert_eq!(
            build_optional_chain(&parts, &checked, false, true).as_deref(),
            Some("foo!.bar?.baz")
        );
    }

    #[test]
    fn refuses_optional_private_access() {
        let private = vec![
            ChainPart::new("foo".into()),
            ChainPart {
                text: "#x".into(),
                optional: false,
                requires_dot: true,
                is_private: true,
                has_non_null: false,
            },
        ];
        let checked: CheckedLengths = [1].into_iter().collect();
        assert_eq!(build_optional_chain(&private, &checked, false, false), None);
    }
}
