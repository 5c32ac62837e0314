//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set.
///
/// The wgpu internals are very chatty at `info`, so they are capped at `warn`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Install a formatting subscriber filtered by `RUST_LOG`, or [`DEFAULT_FILTER`].
///
/// Panics if a global subscriber has already been installed, like
/// `tracing_subscriber::fmt().init()` does.
pub fn init() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Same as [`init`], but silently keeps an existing subscriber.
///
/// Useful in tests, where every test may try to install one.
pub fn try_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
