//! Engine configuration.
//!
//! Loaded from `HISAB_*` environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use hisab_core::validation::validate_currency;
use hisab_core::DEFAULT_CURRENCY;
use hisab_db::DbConfig;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Upper bound for one operation; `None` waits forever
    pub operation_timeout: Option<Duration>,

    /// Currency tag for accounts opened without one
    pub default_currency: String,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("./hisab.db"),
            max_connections: 5,
            operation_timeout: None,
            default_currency: DEFAULT_CURRENCY.to_string(),
            log_filter: "info,hisab=debug,sqlx=warn".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup (environment, test map, ...).
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            database_path: lookup("HISAB_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: match lookup("HISAB_MAX_CONNECTIONS") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("HISAB_MAX_CONNECTIONS".to_string()))?,
                None => defaults.max_connections,
            },

            operation_timeout: match lookup("HISAB_OPERATION_TIMEOUT_SECS") {
                Some(raw) => {
                    let secs: u64 = raw.parse().map_err(|_| {
                        ConfigError::InvalidValue("HISAB_OPERATION_TIMEOUT_SECS".to_string())
                    })?;
                    // 0 disables the timeout
                    (secs > 0).then(|| Duration::from_secs(secs))
                }
                None => defaults.operation_timeout,
            },

            default_currency: lookup("HISAB_DEFAULT_CURRENCY").unwrap_or(defaults.default_currency),

            log_filter: lookup("HISAB_LOG").unwrap_or(defaults.log_filter),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("HISAB_MAX_CONNECTIONS".to_string()));
        }
        validate_currency(&config.default_currency)
            .map_err(|_| ConfigError::InvalidValue("HISAB_DEFAULT_CURRENCY".to_string()))?;

        Ok(config)
    }

    /// Config for tests and throwaway runs: in-memory database.
    pub fn in_memory() -> Self {
        EngineConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            ..EngineConfig::default()
        }
    }

    /// Pool settings derived from this config.
    pub fn db_config(&self) -> DbConfig {
        if self.database_path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
