//! Tracing subscriber setup for binaries and demos

use crate::error::{GatewayError, Result};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for `level`
pub fn default_directive(level: Level) -> String {
    format!("kg_gateway={}", level.as_str().to_ascii_lowercase())
}

/// Install a global fmt subscriber
///
/// `RUST_LOG` wins over `level` when set. Fails instead of panicking if a
/// global subscriber is already installed.
pub fn init_logging(level: Level) -> Result<()> {
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_directive(level)),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| GatewayError::Config(format!("Failed to initialize logging: {}", e)))
}
