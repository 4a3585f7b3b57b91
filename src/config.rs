//! Application configuration

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::RoverError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: Duration,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(30)
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/default")
    }

    /// Load from an optional config file, overridden by `ROVERSTORE__*` variables
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("ROVERSTORE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), RoverError> {
        self.validate_url()?;
        self.validate_pool()?;
        Ok(())
    }

    fn validate_url(&self) -> Result<(), RoverError> {
        if self.url.trim().is_empty() {
            return Err(RoverError::ConfigurationError {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(RoverError::ConfigurationError {
                message: "Database URL must use the postgres:// scheme".to_string(),
            });
        }
        Ok(())
    }

    fn validate_pool(&self) -> Result<(), RoverError> {
        if self.max_connections == 0 {
            return Err(RoverError::ConfigurationError {
                message: "Connection pool must allow at least one connection".to_string(),
            });
        }
        if self.acquire_timeout.is_zero() {
            return Err(RoverError::ConfigurationError {
                message: "Acquire timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
