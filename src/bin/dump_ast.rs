//! AST dumping tool for debugging tree-sitter parsing

use prefer_optional_chain::parser::parse_source_for_path;
use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn print_tree(node: tree_sitter::Node, source: &str, indent: usize) {
    let indent_str = "  ".repeat(indent);
    let kind = node.kind();

    let text = source.get(node.byte_range()).unwrap_or("");
    let text_display: String = if text.chars().count() > 50 {
        format!("{}...", text.chars().take(50).collect::<String>())
    } else {
        text.to_string()
    };
    let text_display = text_display.replace('\n', "\\n");

    println!("{indent_str}{kind}  \"{text_display}\"");

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        print_tree(child, source, indent + 1);
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: dump_ast <file.ts>");
        return ExitCode::from(2);
    }

    let file_path = Path::new(&args[1]);
    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", file_path.display());
            return ExitCode::from(2);
        }
    };

    let tree = match parse_source_for_path(&source, file_path) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::from(2);
        }
    };

    println!("AST for {}:", file_path.display());
    println!("================");
    print_tree(tree.root_node(), &source, 0);
    println!();
    println!("{}", tree.root_node().to_sexp());
    ExitCode::SUCCESS
}
