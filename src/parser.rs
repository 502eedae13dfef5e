use anyhow::{Context, Result};
use std::path::Path;
use tree_sitter::{Language, Parser, Tree};

/// Source dialect selected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    TypeScript,
    Tsx,
}

impl Dialect {
    /// `.tsx` and `.jsx` files need the TSX grammar; everything else parses as TypeScript.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("tsx") | Some("jsx") => Dialect::Tsx,
            _ => Dialect::TypeScript,
        }
    }

    fn language(self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::language_typescript(),
            Dialect::Tsx => tree_sitter_typescript::language_tsx(),
        }
    }
}

pub fn parse_source(source: &str) -> Result<Tree> {
    parse_source_as(source, Dialect::TypeScript)
}

pub fn parse_source_for_path(source: &str, path: &Path) -> Result<Tree> {
    parse_source_as(source, Dialect::for_path(path))
}

pub fn parse_source_as(source: &str, dialect: Dialect) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(dialect.language())
        .context("failed to load TypeScript grammar")?;

    parser
        .parse(source, None)
        .context("tree-sitter failed to parse source")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains_error_node(node: tree_sitter::Node) -> bool {
        if node.kind() == "ERROR" {
            return true;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if contains_error_node(child) {
                return true;
            }
        }
        false
    }

    #[test]
    fn parses_declarations_and_guards_without_error_nodes() {
        let src = r#"declare const foo: { bar: number } | null | undefined;
foo && foo.bar;
!foo || !foo.bar;
(foo || {}).bar;
"#;

        let tree = parse_source(src).expect("parse should succeed");
        assert!(!contains_error_node(tree.root_node()));
    }

    #[test]
    fn parses_optional_chains_and_non_null_assertions() {
        let src = "foo?.bar!.baz?.[0]?.(1);\n";
        let tree = parse_source(src).expect("parse should succeed");
        assert!(!contains_error_node(tree.root_node()));
    }

    #[test]
    fn tsx_dialect_accepts_jsx() {
        let src = "const el = <div>{foo && foo.bar}</div>;\n";
        let tree = parse_source_as(src, Dialect::Tsx).expect("parse should succeed");
        assert!(!contains_error_node(tree.root_node()));
    }

    #[test]
    fn dialect_follows_extension() {
        assert_eq!(Dialect::for_path(Path::new("a/b.tsx")), Dialect::Tsx);
        assert_eq!(Dialect::for_path(Path::new("a/b.jsx")), Dialect::Tsx);
        assert_eq!(Dialect::for_path(Path::new("a/b.ts")), Dialect::TypeScript);
        assert_eq!(Dialect::for_path(Path::new("a/b.mts")), Dialect::TypeScript);
    }
}
