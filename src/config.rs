use crate::error::OptionalChainError;
use crate::lint::LintLevel;
use crate::rules::PreferOptionalChainOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct OptionalChainConfig {
    #[serde(default)]
    pub lints: LintsConfig,

    #[serde(default)]
    pub prefer_optional_chain: PreferOptionalChainOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct LintsConfig {
    #[serde(default)]
    pub disabled: Vec<String>,

    #[serde(flatten)]
    pub levels: HashMap<String, LintLevel>,
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "prefer-optional-chain.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<OptionalChainConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: OptionalChainConfig = toml::from_str(&raw)
        .map_err(|err| OptionalChainError::config(err.to_string()))
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, OptionalChainConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_disabled_and_rule_options() {
        let cfg: OptionalChainConfig = toml::from_str(
            r#"
[lints]
disabled = ["something_else"]
prefer_optional_chain = "error"

[prefer_optional_chain]
requireNullish = true
check_string = false
"#,
        )
        .expect("config should parse");

        assert_eq!(cfg.lints.disabled, ["something_else"]);
        assert_eq!(
            cfg.lints.levels.get("prefer_optional_chain"),
            Some(&LintLevel::Error)
        );
        assert!(cfg.prefer_optional_chain.require_nullish);
        assert!(!cfg.prefer_optional_chain.check_string);
        assert!(cfg.prefer_optional_chain.check_number);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: OptionalChainConfig = toml::from_str("").expect("empty config parses");
        assert!(cfg.lints.levels.is_empty());
        assert_eq!(cfg.prefer_optional_chain, PreferOptionalChainOptions::default());
    }
}
