use anyhow::Error as AnyhowError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for errors emitted by the linter internals.
pub type OptionalChainResult<T> = Result<T, OptionalChainError>;

/// Structured error type for the linter subsystems.
#[derive(Debug, Error)]
pub enum OptionalChainError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl OptionalChainError {
    pub fn parse(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Convert to anyhow::Error for interop with anyhow-based code.
    pub fn into_anyhow(self) -> AnyhowError {
        AnyhowError::new(self)
    }
}

impl From<AnyhowError> for OptionalChainError {
    fn from(err: AnyhowError) -> Self {
        OptionalChainError::other(format!("{err:#}"))
    }
}

/// Convenience macro mirroring `anyhow::bail!` but returning OptionalChainError.
#[macro_export]
macro_rules! oc_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::OptionalChainError::other(format!($($arg)*)));
    };
}

/// Convenience macro mirroring `anyhow::ensure!`.
#[macro_export]
macro_rules! oc_ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::oc_bail!($($arg)*);
        }
    };
}

/// Renders the error with its `source()` chain, outermost first.
pub fn format_error_chain(err: &OptionalChainError) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
