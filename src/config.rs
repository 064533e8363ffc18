use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_size: u32,
    pub connection_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub pool: PoolSettings,
}

impl Config {
    /// Reads `DATABASE_URL`, `DB_POOL_MAX_SIZE` and `DB_POOL_TIMEOUT_SECS`
    /// from the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let defaults = PoolSettings::default();

        let max_size = match lookup("DB_POOL_MAX_SIZE") {
            Some(raw) => parse_var("DB_POOL_MAX_SIZE", raw)?,
            None => defaults.max_size,
        };
        let connection_timeout = match lookup("DB_POOL_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_var("DB_POOL_TIMEOUT_SECS", raw)?),
            None => defaults.connection_timeout,
        };

        if max_size == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_POOL_MAX_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            pool: PoolSettings {
                max_size,
                connection_timeout,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}
