// Basic tracing initialization with a configurable default level.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global subscriber. `RUST_LOG` wins over the configured
/// level when set.
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
