use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
    pub log_filter: String,
}

impl Config {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Reads configuration from the environment, loading a `.env` file first
    /// if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_path =
            env::var("DATABASE_PATH").map_err(|_| ConfigError::Missing("DATABASE_PATH"))?;

        let mut config = Self::new(database_path);
        if let Some(pool_size) = parse_var("DATABASE_POOL_SIZE")? {
            config.pool_size = pool_size;
        }
        if let Some(busy_timeout_ms) = parse_var("DATABASE_BUSY_TIMEOUT_MS")? {
            config.busy_timeout_ms = busy_timeout_ms;
        }
        if let Ok(log_filter) = env::var("LOG_FILTER") {
            config.log_filter = log_filter;
        }

        if config.pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_POOL_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let config = Config::new("/tmp/estate.db");
        assert_eq!(config.database_path, PathBuf::from("/tmp/estate.db"));
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.log_filter, "info");
    }
}
