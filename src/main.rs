use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use prefer_optional_chain::LintEngine;
use prefer_optional_chain::cli::{Args, Command, LintArgs, OutputFormat};
use prefer_optional_chain::config::{self, OptionalChainConfig};
use prefer_optional_chain::diagnostics::Diagnostic;
use prefer_optional_chain::fixer;
use prefer_optional_chain::lint::{LintLevel, LintRegistry, LintSettings};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

fn main() -> ExitCode {
    prefer_optional_chain::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::ListRules) => {
            list_rules();
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Explain { rule }) => {
            explain_rule(&rule)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Lint(lint)) => lint_command(lint),
        None => lint_command(args.lint),
    }
}

fn list_rules() {
    let registry = LintRegistry::default_rules();
    let settings = LintSettings::default();
    for d in registry.descriptors().sorted_by_key(|d| d.name) {
        let fix_status = if d.fix.available {
            format!(" [fix: {}]", d.fix.safety.as_str())
        } else {
            String::new()
        };
        println!(
            "{}\t{}\t{}\t{}{}",
            d.name,
            d.category.as_str(),
            settings.level_for(d.name).as_str(),
            d.description,
            fix_status
        );
    }
}

fn explain_rule(rule: &str) -> anyhow::Result<()> {
    let Some(d) = LintRegistry::default_rules().find_descriptor(rule) else {
        anyhow::bail!("unknown lint: {rule}");
    };

    println!("name: {}", d.name);
    println!("category: {}", d.category.as_str());
    println!("description: {}", d.description);
    if d.fix.available {
        println!("fix: available ({})", d.fix.safety.as_str());
        if !d.fix.description.is_empty() {
            println!("fix description: {}", d.fix.description);
        }
    } else {
        println!("fix: not available");
    }
    Ok(())
}

/// Engine built from the config file with CLI overrides applied.
fn build_engine(args: &LintArgs) -> anyhow::Result<LintEngine> {
    let start_dir = infer_start_dir(args)?;
    let loaded_cfg = config::load_config(args.config.as_deref(), &start_dir)?;
    let cfg = loaded_cfg.map(|(_path, cfg)| cfg).unwrap_or_default();
    let OptionalChainConfig {
        lints,
        prefer_optional_chain: mut options,
    } = cfg;

    options.allow_unsafe_fixes |= args.unsafe_fixes;
    options.require_nullish |= args.require_nullish;

    let registry =
        LintRegistry::default_rules_filtered(&args.only, &args.skip, &lints.disabled, options)?;
    let settings = LintSettings::default()
        .with_config_levels(lints.levels)
        .disable(lints.disabled);
    Ok(LintEngine::new_with_settings(registry, settings))
}

fn lint_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    if args.fix {
        return fix_command(args);
    }

    let engine = build_engine(&args)?;

    let mut all: Vec<Diagnostic> = Vec::new();
    if args.paths.is_empty() {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        let mut diags = engine.lint_source(&source)?;
        for d in &mut diags {
            d.file = Some("stdin".to_string());
        }
        all.append(&mut diags);
    } else {
        for path in collect_source_files(&args.paths)? {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            all.append(&mut engine.lint_source_with_path(&source, &path)?);
        }
    }

    let has_error = all.iter().any(|d| d.level == LintLevel::Error);
    match args.format {
        OutputFormat::Json => print_json(&all)?,
        OutputFormat::Pretty => print_pretty(&all),
        OutputFormat::Github => print_github(&all, args.deny_warnings),
    }

    if has_error || (args.deny_warnings && !all.is_empty()) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic {
    file: String,
    row: usize,
    column: usize,
    end_row: usize,
    end_column: usize,
    level: String,
    lint: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<JsonFix>,
}

#[derive(Debug, Serialize)]
struct JsonFix {
    kind: &'static str,
    message: String,
    start_byte: usize,
    end_byte: usize,
    replacement: String,
}

fn file_of(diag: &Diagnostic) -> String {
    diag.file.clone().unwrap_or_else(|| "<unknown>".to_string())
}

fn print_json(diags: &[Diagnostic]) -> anyhow::Result<()> {
    let mut out: Vec<JsonDiagnostic> = diags
        .iter()
        .map(|d| JsonDiagnostic {
            file: file_of(d),
            row: d.span.start.row,
            column: d.span.start.column,
            end_row: d.span.end.row,
            end_column: d.span.end.column,
            level: d.level.as_str().to_string(),
            lint: d.lint.name.to_string(),
            message: d.message.clone(),
            fix: d.suggestion.as_ref().map(|s| JsonFix {
                kind: s.applicability.as_str(),
                message: s.message.clone(),
                start_byte: s.edit.start_byte,
                end_byte: s.edit.end_byte,
                replacement: s.edit.replacement.clone(),
            }),
        })
        .collect();

    out.sort_by(|a, b| {
        (a.file.as_str(), a.row, a.column, a.lint.as_str())
            .cmp(&(b.file.as_str(), b.row, b.column, b.lint.as_str()))
    });

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn print_pretty(diags: &[Diagnostic]) {
    for diag in diags {
        println!(
            "{}:{}:{}: {}: {}: {}",
            file_of(diag),
            diag.span.start.row,
            diag.span.start.column,
            diag.level.as_str(),
            diag.lint.name,
            diag.message
        );
        if let Some(suggestion) = &diag.suggestion {
            println!(
                "  {} ({}): `{}`",
                suggestion.message,
                suggestion.applicability.as_str(),
                suggestion.edit.replacement
            );
        }
    }
    println!("{} diagnostics", diags.len());
}

fn print_github(diags: &[Diagnostic], deny_warnings: bool) {
    for diag in diags {
        let kind = if diag.level == LintLevel::Error
            || (deny_warnings && diag.level == LintLevel::Warn)
        {
            "error"
        } else {
            "warning"
        };
        println!(
            "::{} file={},line={},col={},title={}::{}",
            kind,
            github_escape(&file_of(diag)),
            diag.span.start.row,
            diag.span.start.column,
            diag.lint.name,
            github_escape(&diag.message)
        );
    }
}

/// Handle --fix mode: apply auto-fixes to files.
fn fix_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    if args.paths.is_empty() {
        anyhow::bail!("--fix requires file paths (stdin not supported)");
    }

    let engine = build_engine(&args)?;
    let files = collect_source_files(&args.paths)?;
    let mut total_fixed = 0usize;
    let mut total_skipped = 0usize;
    let mut files_modified = 0usize;

    const MAX_ITERATIONS: usize = 10;

    for path in &files {
        let original_source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut current_source = original_source.clone();
        let mut file_fixes = 0usize;
        let mut file_skipped = 0usize;
        let mut iterations = 0usize;

        // Overlapping fixes are deferred to the next pass.
        loop {
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                eprintln!(
                    "Warning: Max fix iterations ({}) reached for {}",
                    MAX_ITERATIONS,
                    path.display()
                );
                break;
            }

            let diagnostics = engine.lint_source_with_path(&current_source, path)?;
            let result = fixer::apply_fixes(&current_source, &diagnostics, args.unsafe_fixes)
                .with_context(|| format!("failed to apply fixes to {}", path.display()))?;
            file_skipped = result.fixes_skipped;

            if result.fixes_applied == 0 {
                break;
            }
            file_fixes += result.fixes_applied;
            current_source = result.fixed_source;
        }
        total_skipped += file_skipped;

        if file_fixes == 0 {
            continue;
        }
        total_fixed += file_fixes;

        if args.fix_dry_run {
            let diff = fixer::format_diff(&original_source, &current_source, path);
            if !diff.is_empty() {
                println!("{diff}");
            }
            continue;
        }

        if !args.no_backup {
            let backup_path = path.with_extension(format!(
                "{}.bak",
                path.extension().unwrap_or_default().to_string_lossy()
            ));
            std::fs::write(&backup_path, &original_source)
                .with_context(|| format!("failed to write {}", backup_path.display()))?;
        }
        std::fs::write(path, &current_source)
            .with_context(|| format!("failed to write {}", path.display()))?;
        files_modified += 1;
    }

    if args.fix_dry_run {
        println!(
            "\n{} fix(es) would be applied to {} file(s)",
            total_fixed,
            files.len()
        );
    } else {
        println!(
            "Applied {} fix(es) to {} file(s)",
            total_fixed, files_modified
        );
    }
    if total_skipped > 0 {
        println!(
            "{} suggestion(s) skipped (use --unsafe-fixes to apply)",
            total_skipped
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn github_escape(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn should_skip_dir(name: &str) -> bool {
    name == "node_modules" || (name.starts_with('.') && name.len() > 1 && name != "..")
}

fn collect_source_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("failed to access {}", path.display()))?;
        if !meta.is_dir() {
            out.push(path.clone());
            continue;
        }

        let walker = WalkDir::new(path).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry.file_name().to_str().is_some_and(should_skip_dir)
        });
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() && is_source_file(entry.path()) {
                out.push(entry.into_path());
            }
        }
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn infer_start_dir(args: &LintArgs) -> anyhow::Result<PathBuf> {
    let base = match args.paths.first() {
        Some(p) => p.clone(),
        None => std::env::current_dir()?,
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}
