//! Log output for the `sheetbind` binary.
//!
//! Filtered through `RUST_LOG` (default `info`), e.g.
//! `RUST_LOG=sheetbind=debug` to see column resolution and skipped rows.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber, writing to stderr so stdout stays
/// reserved for command output.
///
/// ```no_run
/// sheetbind::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Debug-level subscriber captured by the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
