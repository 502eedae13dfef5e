use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// prefer-optional-chain CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "prefer-optional-chain",
    version,
    about = "Rewrite guard chains like `foo && foo.bar` as optional chains in TypeScript",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub lint: LintArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lint files or directories.
    Lint(LintArgs),

    /// List available lints.
    ListRules,

    /// Explain a lint.
    Explain {
        /// Lint rule name.
        rule: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct LintArgs {
    /// Files/directories to lint. Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Only run these lints (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these lints (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Exit with code 1 if any diagnostics are emitted.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Path to a `prefer-optional-chain.toml` (otherwise discovered upwards).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Apply fixes in place.
    #[arg(long)]
    pub fix: bool,

    /// Print the fixes as a unified diff without writing files.
    #[arg(long, requires = "fix")]
    pub fix_dry_run: bool,

    /// Also apply rewrites that may change the expression's value, and emit
    /// them as fixes rather than suggestions.
    #[arg(long)]
    pub unsafe_fixes: bool,

    /// Do not write `.bak` backups when fixing.
    #[arg(long)]
    pub no_backup: bool,

    /// Only convert guards that test for null/undefined explicitly.
    #[arg(long)]
    pub require_nullish: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Github,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_paths_lint_by_default() {
        let args = Args::try_parse_from(["prefer-optional-chain", "src", "--unsafe-fixes"])
            .expect("args parse");
        assert!(args.command.is_none());
        assert_eq!(args.lint.paths, [PathBuf::from("src")]);
        assert!(args.lint.unsafe_fixes);
    }

    #[test]
    fn dry_run_requires_fix() {
        assert!(Args::try_parse_from(["prefer-optional-chain", "--fix-dry-run", "a.ts"]).is_err());
        let args = Args::try_parse_from(["prefer-optional-chain", "--fix", "--fix-dry-run", "a.ts"])
            .expect("args parse");
        assert!(args.lint.fix && args.lint.fix_dry_run);
    }

    #[test]
    fn subcommands_parse() {
        let args = Args::try_parse_from(["prefer-optional-chain", "explain", "prefer_optional_chain"])
            .expect("args parse");
        assert!(matches!(args.command, Some(Command::Explain { rule }) if rule == "prefer_optional_chain"));
        let args = Args::try_parse_from(["prefer-optional-chain", "lint", "--only", "a,b", "x.ts"])
            .expect("args parse");
        let Some(Command::Lint(lint)) = args.command else {
            panic!("expected lint subcommand");
        };
        assert_eq!(lint.only, ["a", "b"]);
    }
}
