use tree_sitter::Node;

pub(crate) fn walk<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>)) {
    f(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, f);
    }
}

pub(crate) fn slice<'a>(source: &'a str, node: Node) -> &'a str {
    slice_range(source, node.start_byte(), node.end_byte())
}

pub(crate) fn slice_range(source: &str, start: usize, end: usize) -> &str {
    // tree-sitter offsets are UTF-8 byte indices; misaligned offsets fall back to "".
    source.get(start..end).unwrap_or("")
}

/// First named child that is not a comment.
pub(crate) fn first_expr_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    found
}

fn last_expr_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .last();
    found
}

pub(crate) fn is_paren(node: Node) -> bool {
    node.kind() == "parenthesized_expression"
}

pub(crate) fn unwrap_parens(mut node: Node) -> Node {
    while is_paren(node) {
        match first_expr_child(node) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Inner expression of a `!`-assertion, `as`, `satisfies` or `<T>` assertion.
pub(crate) fn assertion_inner(node: Node) -> Option<Node> {
    match node.kind() {
        "non_null_expression" | "as_expression" | "satisfies_expression" => first_expr_child(node),
        "type_assertion" => last_expr_child(node),
        _ => None,
    }
}

/// Strips parentheses, non-null assertions and type assertions.
pub(crate) fn unwrap_for_comparison(mut node: Node) -> Node {
    loop {
        if is_paren(node) {
            match first_expr_child(node) {
                Some(inner) => node = inner,
                None => return node,
            }
        } else if let Some(inner) = assertion_inner(node) {
            node = inner;
        } else {
            return node;
        }
    }
}

pub(crate) fn is_member(node: Node) -> bool {
    node.kind() == "member_expression"
}

pub(crate) fn is_subscript(node: Node) -> bool {
    node.kind() == "subscript_expression"
}

pub(crate) fn is_call(node: Node) -> bool {
    node.kind() == "call_expression"
}

/// Property, element or call access.
pub(crate) fn is_access(node: Node) -> bool {
    is_member(node) || is_subscript(node) || is_call(node)
}

/// The expression an access is performed on (`object` or call `function`).
pub(crate) fn access_object(node: Node) -> Option<Node> {
    match node.kind() {
        "member_expression" | "subscript_expression" => node.child_by_field_name("object"),
        "call_expression" => node.child_by_field_name("function"),
        _ => None,
    }
}

/// Whether this access node itself carries a `?.` token.
pub(crate) fn has_optional_token(node: Node) -> bool {
    if !is_access(node) {
        return false;
    }
    if node.child_by_field_name("optional_chain").is_some() {
        return true;
    }
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| matches!(child.kind(), "optional_chain" | "?."));
    found
}

pub(crate) fn member_property(node: Node) -> Option<Node> {
    node.child_by_field_name("property")
}

pub(crate) fn subscript_index(node: Node) -> Option<Node> {
    node.child_by_field_name("index")
}

pub(crate) fn call_arguments(node: Node) -> Option<Node> {
    node.child_by_field_name("arguments")
}

pub(crate) fn call_type_arguments(node: Node) -> Option<Node> {
    if let Some(args) = node.child_by_field_name("type_arguments") {
        return Some(args);
    }
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "type_arguments");
    found
}

pub(crate) fn operator_kind(node: Node) -> Option<&'static str> {
    node.child_by_field_name("operator").map(|op| op.kind())
}

/// `(left, operator, right)` of a binary expression.
pub(crate) fn binary_parts(node: Node) -> Option<(Node, &'static str, Node)> {
    if node.kind() != "binary_expression" {
        return None;
    }
    let left = node.child_by_field_name("left")?;
    let right = node.child_by_field_name("right")?;
    Some((left, operator_kind(node)?, right))
}

pub(crate) fn is_logical(node: Node, operator: &str) -> bool {
    binary_parts(node).is_some_and(|(_, op, _)| op == operator)
}

/// `(operator, argument)` of a prefix unary expression.
pub(crate) fn unary_parts(node: Node) -> Option<(&'static str, Node)> {
    if node.kind() != "unary_expression" {
        return None;
    }
    Some((operator_kind(node)?, node.child_by_field_name("argument")?))
}

pub(crate) fn is_null(node: Node) -> bool {
    node.kind() == "null"
}

pub(crate) fn is_undefined_ident(node: Node, source: &str) -> bool {
    node.kind() == "undefined" || (node.kind() == "identifier" && slice(source, node) == "undefined")
}

pub(crate) fn is_void_expr(node: Node) -> bool {
    unary_parts(node).is_some_and(|(op, _)| op == "void")
}

/// `undefined` or a `void` expression.
pub(crate) fn is_undefined_value(node: Node, source: &str) -> bool {
    is_undefined_ident(node, source) || is_void_expr(node)
}

pub(crate) fn is_string_literal(node: Node) -> bool {
    node.kind() == "string"
}

pub(crate) fn string_literal_value<'a>(source: &'a str, node: Node) -> Option<&'a str> {
    if !is_string_literal(node) {
        return None;
    }
    let text = slice(source, node);
    text.get(1..text.len().saturating_sub(1))
}

pub(crate) fn is_identifier(node: Node) -> bool {
    node.kind() == "identifier"
}

pub(crate) fn is_this(node: Node) -> bool {
    node.kind() == "this"
}

pub(crate) fn is_identifier_or_this(node: Node) -> bool {
    is_identifier(node) || is_this(node)
}

pub(crate) fn is_literal_value(node: Node) -> bool {
    matches!(
        node.kind(),
        "number" | "string" | "true" | "false" | "object" | "array"
    )
}

pub(crate) fn is_function_like(node: Node) -> bool {
    matches!(
        node.kind(),
        "function" | "function_expression" | "arrow_function" | "generator_function"
    )
}

pub(crate) fn is_inside_jsx(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.kind() == "jsx_expression" {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// Whether `node` contains a `?.` access anywhere along its access chain.
pub(crate) fn contains_optional_chain(node: Node) -> bool {
    let node = unwrap_parens(node);
    if is_access(node) {
        if has_optional_token(node) {
            return true;
        }
        return access_object(node).is_some_and(contains_optional_chain);
    }
    if let Some((left, _, right)) = binary_parts(node) {
        return contains_optional_chain(left) || contains_optional_chain(right);
    }
    false
}

/// Root of an access chain: `foo` for `(foo as any)!.bar[0]()`.
pub(crate) fn base_expression(mut node: Node) -> Node {
    loop {
        let next = if is_access(node) {
            access_object(node)
        } else if is_paren(node) {
            first_expr_child(node)
        } else if matches!(node.kind(), "non_null_expression" | "as_expression" | "type_assertion") {
            assertion_inner(node)
        } else {
            None
        };
        match next {
            Some(inner) => node = inner,
            None => return node,
        }
    }
}

/// Parent after skipping enclosing parentheses, together with the outermost
/// parenthesized node (or `node` itself).
pub(crate) fn parent_through_parens(node: Node) -> (Option<Node>, Node) {
    let mut outer = node;
    let mut parent = node.parent();
    while let Some(p) = parent {
        if !is_paren(p) {
            break;
        }
        outer = p;
        parent = p.parent();
    }
    (parent, outer)
}

pub(crate) fn same_node(a: Node, b: Node) -> bool {
    a.id() == b.id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn find<'t>(root: Node<'t>, kind: &str) -> Option<Node<'t>> {
        let mut found = None;
        walk(root, &mut |n| {
            if found.is_none() && n.kind() == kind {
                found = Some(n);
            }
        });
        found
    }

    #[test]
    fn test_unwrap_for_comparison_strips_wrappers() {
        let source = "((foo as any)!);";
        let tree = parse_source(source).unwrap();
        let paren = find(tree.root_node(), "parenthesized_expression").unwrap();
        let inner = unwrap_for_comparison(paren);
        assert_eq!(slice(source, inner), "foo");
    }

    #[test]
    fn test_optional_token_detection() {
        let source = "a?.b.c;";
        let tree = parse_source(source).unwrap();
        let outer = find(tree.root_node(), "member_expression").unwrap();
        assert_eq!(slice(source, outer), "a?.b.c");
        assert!(!has_optional_token(outer));
        assert!(contains_optional_chain(outer));
        let inner = access_object(outer).unwrap();
        assert!(has_optional_token(inner));
    }

    #[test]
    fn test_base_expression() {
        let source = "(foo as any)!.bar[0]();";
        let tree = parse_source(source).unwrap();
        let call = find(tree.root_node(), "call_expression").unwrap();
        assert_eq!(slice(source, base_expression(call)), "foo");
    }

    #[test]
    fn test_binary_parts_and_literals() {
        let source = "foo.bar !== undefined;";
        let tree = parse_source(source).unwrap();
        let bin = find(tree.root_node(), "binary_expression").unwrap();
        let (left, op, right) = binary_parts(bin).unwrap();
        assert_eq!(slice(source, left), "foo.bar");
        assert_eq!(op, "!==");
        assert!(is_undefined_value(right, source));
    }
}
