//! Configuration management for the Pharma Inventory Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with PHI_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use shared::validation::{
    validate_forecast_horizon, validate_lead_time, validate_service_level,
};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Demand forecast service configuration
    pub forecast: ForecastConfig,

    /// Reorder policy configuration
    pub reorder: ReorderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    /// Forecast service base URL
    pub base_url: String,

    /// Shared API key sent in the X-API-Key header
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Forecast horizon requested from the service
    pub horizon_days: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReorderConfig {
    /// Lead time used when a drug has no supplier lead time configured
    pub default_lead_time_days: u32,

    /// Target probability of not stocking out during lead time
    pub service_level: f64,

    /// Trailing window of usage history for the statistical fallback
    pub historical_window_days: u32,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("PHI_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("forecast.timeout_seconds", 30)?
            .set_default("forecast.horizon_days", 7)?
            .set_default("reorder.default_lead_time_days", 7)?
            .set_default("reorder.service_level", 0.95)?
            .set_default("reorder.historical_window_days", 14)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PHI_ prefix)
            .add_source(
                Environment::with_prefix("PHI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the policy engine cannot operate with
    fn validate(&self) -> Result<(), ConfigError> {
        validate_service_level(self.reorder.service_level)
            .map_err(|m| ConfigError::Message(format!("reorder.service_level: {}", m)))?;
        validate_lead_time(self.reorder.default_lead_time_days)
            .map_err(|m| ConfigError::Message(format!("reorder.default_lead_time_days: {}", m)))?;
        validate_forecast_horizon(self.forecast.horizon_days)
            .map_err(|m| ConfigError::Message(format!("forecast.horizon_days: {}", m)))?;
        if self.reorder.historical_window_days == 0 {
            return Err(ConfigError::Message(
                "reorder.historical_window_days must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
