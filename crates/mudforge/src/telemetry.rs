//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"info,mudforge=debug"`) when it's unset.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(default_filter, "tracing initialised");
    }
}
