//! Log output for binaries and tests. The library itself only uses the `log`
//! macros; nothing is printed unless one of these is called.

use env_logger::{Builder, Env};

/// Environment variable holding the filter, e.g. `CITERON_LOG=citeron=trace`.
pub const LOG_ENV: &str = "CITERON_LOG";

const DEFAULT_FILTER: &str = "warn";

fn builder() -> Builder {
    Builder::from_env(Env::new().filter_or(LOG_ENV, DEFAULT_FILTER))
}

/// Install the global logger.
///
/// # Panics
/// - If a global logger has already been installed
pub fn init() {
    builder().init();
}

/// Install a logger whose output is captured by the test harness. Safe to call
/// from every test.
pub fn init_for_tests() {
    let _ = builder().is_test(true).try_init();
}
