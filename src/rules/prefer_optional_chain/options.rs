use serde::{Deserialize, Serialize};

/// Behavior switches for the optional-chain rule.
///
/// Field names follow the camelCase spelling used in JSON rule configs; the
/// snake_case spelling is accepted in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreferOptionalChainOptions {
    /// Only convert chains whose guards test for null or undefined explicitly.
    #[serde(alias = "require_nullish")]
    pub require_nullish: bool,
    /// Emit unconditional fixes even where the rewrite may change the
    /// expression's result type.
    #[serde(
        rename = "allowPotentiallyUnsafeFixesThatModifyTheReturnTypeIKnowWhatImDoing",
        alias = "allowUnsafeFixes",
        alias = "allow_unsafe_fixes"
    )]
    pub allow_unsafe_fixes: bool,
    #[serde(alias = "check_any")]
    pub check_any: bool,
    #[serde(alias = "check_unknown")]
    pub check_unknown: bool,
    #[serde(rename = "checkBigInt", alias = "check_big_int", alias = "check_bigint")]
    pub check_big_int: bool,
    #[serde(alias = "check_boolean")]
    pub check_boolean: bool,
    #[serde(alias = "check_number")]
    pub check_number: bool,
    #[serde(alias = "check_string")]
    pub check_string: bool,
}

impl Default for PreferOptionalChainOptions {
    fn default() -> Self {
        Self {
            require_nullish: false,
            allow_unsafe_fixes: false,
            check_any: true,
            check_unknown: true,
            check_big_int: true,
            check_boolean: true,
            check_number: true,
            check_string: true,
        }
    }
}

impl PreferOptionalChainOptions {
    #[must_use]
    pub fn with_unsafe_fixes(mut self, allow: bool) -> Self {
        self.allow_unsafe_fixes = allow;
        self
    }

    #[must_use]
    pub fn with_require_nullish(mut self, require: bool) -> Self {
        self.require_nullish = require;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_check_every_category() {
        let opts = PreferOptionalChainOptions::default();
        assert!(!opts.require_nullish);
        assert!(!opts.allow_unsafe_fixes);
        assert!(opts.check_any && opts.check_unknown && opts.check_big_int);
        assert!(opts.check_boolean && opts.check_number && opts.check_string);
    }

    #[test]
    fn accepts_camel_case_json() {
        let opts: PreferOptionalChainOptions = serde_json::from_str(
            r#"{"allowPotentiallyUnsafeFixesThatModifyTheReturnTypeIKnowWhatImDoing": true, "checkBigInt": false}"#,
        )
        .expect("options should deserialize");
        assert!(opts.allow_unsafe_fixes);
        assert!(!opts.check_big_int);
        assert!(opts.check_string);
    }

    #[test]
    fn accepts_snake_case_toml() {
        let opts: PreferOptionalChainOptions =
            toml::from_str("require_nullish = true\ncheck_string = false\n")
                .expect("options should deserialize");
        assert!(opts.require_nullish);
        assert!(!opts.check_string);
        assert!(opts.check_number);
    }
}
