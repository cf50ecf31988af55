//! Tracing setup for binaries built on Docgate.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when `RUST_LOG` is unset or unparsable.
///
/// Returns `false` if a global subscriber was already installed, so
/// calling it twice (e.g. from several tests) is harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(false).try_init().is_ok()
}
