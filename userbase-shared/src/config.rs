/// Configuration management
///
/// Loads settings from environment variables (and a `.env` file if present)
/// into a type-safe struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `DATABASE_MIN_CONNECTIONS`: idle connections kept open (default: 2)
/// - `DATABASE_CONNECT_TIMEOUT_SECONDS`: acquire timeout (default: 30)
/// - `ACTIVATION_CODE_LENGTH`: length of issued activation codes (default: 20)
///
/// # Example
///
/// ```no_run
/// use userbase_shared::config::Config;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env()?;
/// println!("Pool size: {}", config.database.max_connections);
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use crate::auth::activation::{MAX_CODE_LENGTH, MIN_CODE_LENGTH};
use crate::db::pool::DatabaseConfig;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// A variable is set but cannot be used
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Complete configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database pool configuration
    pub database: DatabaseConfig,

    /// Length of generated activation codes
    pub activation_code_length: usize,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let defaults = DatabaseConfig::default();
        let max_connections =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", defaults.max_connections)?;
        let min_connections =
            parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", defaults.min_connections)?;
        let connect_timeout_seconds = parse_or(
            &lookup,
            "DATABASE_CONNECT_TIMEOUT_SECONDS",
            defaults.connect_timeout_seconds,
        )?;

        if min_connections > max_connections {
            return Err(ConfigError::Invalid {
                name: "DATABASE_MIN_CONNECTIONS",
                reason: format!("must not exceed DATABASE_MAX_CONNECTIONS ({})", max_connections),
            });
        }

        let activation_code_length =
            parse_or(&lookup, "ACTIVATION_CODE_LENGTH", MAX_CODE_LENGTH)?;

        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&activation_code_length) {
            return Err(ConfigError::Invalid {
                name: "ACTIVATION_CODE_LENGTH",
                reason: format!("must be between {} and {}", MIN_CODE_LENGTH, MAX_CODE_LENGTH),
            });
        }

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
                connect_timeout_seconds,
                ..defaults
            },
            activation_code_length,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
