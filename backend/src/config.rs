//! Configuration management for the Shelftrack backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with SHELF_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::ExpiryThresholds;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Expiry classification thresholds
    pub thresholds: ThresholdConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite database URL
    pub url: String,

    /// Maximum number of connections in the pool.
    /// The engine assumes a single logical writer; keep this at 1 unless
    /// every caller is read-only.
    pub max_connections: u32,
}

/// Expiry thresholds in days, with documented defaults (7, 30)
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ThresholdConfig {
    pub critical_days: i64,
    pub proximate_days: i64,
}

impl ThresholdConfig {
    /// Convert to the shared value object, applying the swap-if-inverted
    /// normalization rule.
    pub fn to_thresholds(self) -> ExpiryThresholds {
        ExpiryThresholds::new(self.critical_days, self.proximate_days)
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let environment =
            std::env::var("SHELF_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.url", "sqlite://db/shelftrack.db")?
            .set_default("database.max_connections", 1)?
            .set_default("thresholds.critical_days", 7)?
            .set_default("thresholds.proximate_days", 30)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SHELF_ prefix)
            .add_source(
                Environment::with_prefix("SHELF")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            critical_days: 7,
            proximate_days: 30,
        }
    }
}
