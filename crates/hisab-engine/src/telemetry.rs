//! # Tracing Setup
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages (repository statements included)
//! - `RUST_LOG=hisab_engine=trace` - Trace for the engine only
//! - Default: `EngineConfig::log_filter`

use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter. Returns `false` when a
/// subscriber was already installed (tests, embedding applications).
pub fn init(config: &EngineConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
