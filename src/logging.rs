//! Logging initialization helpers.
//!
//! The library itself only emits `tracing` events; binaries and test
//! harnesses embedding it can use these helpers to get a sensible
//! subscriber without pulling in their own setup code.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("menuflow=info"))
}

/// Try to initialize a compact stderr subscriber.
///
/// Uses `RUST_LOG` for filtering when set, otherwise `menuflow=info`.
/// Returns `Err` if a global subscriber is already installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

/// Try to initialize with an explicit filter directive, e.g. `"menuflow=trace"`.
pub fn try_init_with(filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}
