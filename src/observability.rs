//! Logging and observability helpers.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "sqlmock=info";

/// Installs a fmt subscriber writing through the test harness
///
/// `RUST_LOG` overrides the default filter. Calling this more than once is
/// harmless; only the first call installs anything.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
