pub(crate) mod util;

pub mod prefer_optional_chain;

pub use prefer_optional_chain::PreferOptionalChainLint;
pub use prefer_optional_chain::options::PreferOptionalChainOptions;

use crate::lint::LintRegistry;

/// Registry holding every built-in rule, configured with `options`.
pub fn build_registry(options: PreferOptionalChainOptions) -> LintRegistry {
    LintRegistry::new().with_rule(PreferOptionalChainLint::new(options))
}
