#[cfg(feature = "telemetry")]
use std::sync::OnceLock;

#[cfg(feature = "telemetry")]
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize tracing subscriber once per process.
///
/// The filter comes from `RUST_LOG`, defaulting to
/// `prefer_optional_chain=info`. Output goes to stderr so diagnostics on
/// stdout stay machine-readable.
#[cfg(feature = "telemetry")]
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();

    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("prefer_optional_chain=info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing() {}

/// Instrument an inline block with a span if telemetry is enabled.
#[macro_export]
macro_rules! instrument_block {
    ($name:expr, $block:block) => {{
        #[cfg(feature = "telemetry")]
        {
            let span = tracing::info_span!("prefer_optional_chain", phase = $name);
            let _guard = span.enter();
            (|| $block)()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            (|| $block)()
        }
    }};
}

/// Debug-level event; compiled out without telemetry.
#[macro_export]
macro_rules! trace_event {
    ($($arg:tt)*) => {{
        #[cfg(feature = "telemetry")]
        {
            tracing::debug!($($arg)*);
        }
    }};
}
