//! `(foo || {}).bar` → `foo?.bar`

use super::context::{Analysis, FixKind, Report, TextRange};
use crate::fix::TextEdit;
use crate::rules::util::{
    access_object, binary_parts, first_expr_child, has_optional_token, is_member, is_paren,
    is_subscript, member_property, same_node, subscript_index,
};
use tree_sitter::Node;

fn is_empty_object(node: Node) -> bool {
    let node = if is_paren(node) {
        match first_expr_child(node) {
            Some(inner) => inner,
            None => return false,
        }
    } else {
        node
    };
    if node.kind() != "object" {
        return false;
    }
    let mut cursor = node.walk();
    let empty = node
        .named_children(&mut cursor)
        .all(|child| child.kind() == "comment");
    empty
}

/// Left operands that bind looser than `?.` and must keep their parentheses.
fn needs_parens(node: Node) -> bool {
    matches!(
        node.kind(),
        "await_expression"
            | "binary_expression"
            | "ternary_expression"
            | "unary_expression"
            | "update_expression"
            | "as_expression"
            | "satisfies_expression"
    )
}

/// The member or element access performed directly on `node` (or on the
/// single pair of parentheses wrapping it).
fn enclosing_access(node: Node) -> Option<Node> {
    let parent = node.parent()?;
    let (access, object) = if is_member(parent) || is_subscript(parent) {
        (parent, node)
    } else if is_paren(parent) {
        let grandparent = parent.parent()?;
        if !(is_member(grandparent) || is_subscript(grandparent)) {
            return None;
        }
        (grandparent, parent)
    } else {
        return None;
    };
    access_object(access)
        .filter(|o| same_node(*o, object))
        .map(|_| access)
}

impl<'a, 't> Analysis<'a, 't> {
    pub(crate) fn check_empty_object(&mut self, node: Node<'t>) {
        if self.options.require_nullish {
            return;
        }
        let Some((left, operator, right)) = binary_parts(node) else {
            return;
        };
        if !matches!(operator, "||" | "??") || !is_empty_object(right) {
            return;
        }
        let Some(access) = enclosing_access(node) else {
            return;
        };
        if has_optional_token(access) {
            return;
        }

        let property = if is_member(access) {
            // `?.#bar` is not valid syntax.
            if member_property(access).is_some_and(|p| p.kind() == "private_property_identifier") {
                return;
            }
            member_property(access).map(|p| self.text(p).to_string())
        } else {
            subscript_index(access).map(|i| format!("[{}]", self.text(i)))
        };
        let Some(property) = property else {
            return;
        };

        let left_text = self.text(left).trim();
        let left_text = if needs_parens(left) {
            format!("({left_text})")
        } else {
            left_text.to_string()
        };

        let range = TextRange::of(access);
        let kind = if self.unsafe_fixes() {
            FixKind::Fix
        } else {
            FixKind::Suggestion
        };
        self.push_report(Report {
            anchor: access.range(),
            edit: TextEdit::replace(range.start, range.end, format!("{left_text}?.{property}")),
            kind,
        });
    }
}
