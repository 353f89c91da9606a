//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialize a human-readable tracing subscriber
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this twice is
/// a no-op rather than a panic, so tests and embedding binaries can both
/// call it.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize a tracing subscriber that emits one JSON object per event
pub fn init_tracing_json(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .try_init();
}
