//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Data directory cannot be empty")]
    EmptyDataDir,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid challenge_expiry_seconds: {0}. Must be positive")]
    InvalidChallengeExpiry(i64),

    #[error("Invalid cycle_delay_seconds: {0}. Must be positive")]
    InvalidCycleDelay(f64),

    #[error("Invalid max_plan_attempts: {0}. Cannot be 0")]
    InvalidMaxPlanAttempts(u32),

    #[error("Invalid check_interval_seconds: {0}. Cannot be 0")]
    InvalidCheckInterval(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .mindx/config.yaml (project config)
    /// 3. .mindx/local.yaml (project local overrides, optional)
    /// 4. Environment variables (MINDX_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".mindx/config.yaml"))
            .merge(Yaml::file(".mindx/local.yaml"))
            .merge(Env::prefixed("MINDX_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.data_dir.is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.guardian.challenge_expiry_seconds <= 0 {
            return Err(ConfigError::InvalidChallengeExpiry(
                config.guardian.challenge_expiry_seconds,
            ));
        }

        if config.agint.cycle_delay_seconds <= 0.0 {
            return Err(ConfigError::InvalidCycleDelay(
                config.agint.cycle_delay_seconds,
            ));
        }

        if config.bdi.max_plan_attempts == 0 {
            return Err(ConfigError::InvalidMaxPlanAttempts(
                config.bdi.max_plan_attempts,
            ));
        }

        if config.audit.check_interval_seconds == 0 {
            return Err(ConfigError::InvalidCheckInterval(
                config.audit.check_interval_seconds,
            ));
        }

        Ok(())
    }
}
