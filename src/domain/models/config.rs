//! Configuration model for mindx.
//!
//! Loaded by the figment-based loader in `infrastructure::config` with
//! hierarchical merging: defaults -> `.mindx/config.yaml` ->
//! `.mindx/local.yaml` -> `MINDX_`-prefixed environment variables.

use serde::{Deserialize, Serialize};

/// Main configuration structure for mindx.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Root of the persisted state layout (`data/identity`, `data/config`,
    /// `data/memory`, `data/beliefs.json`).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Guardian admission configuration
    #[serde(default)]
    pub guardian: GuardianConfig,

    /// AGInt cognitive loop configuration
    #[serde(default)]
    pub agint: AgintConfig,

    /// BDI executor configuration
    #[serde(default)]
    pub bdi: BdiConfig,

    /// Audit coordinator configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Text generator endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search endpoint configuration
    #[serde(default)]
    pub search: SearchConfig,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            logging: LoggingConfig::default(),
            guardian: GuardianConfig::default(),
            agint: AgintConfig::default(),
            bdi: BdiConfig::default(),
            audit: AuditConfig::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Guardian admission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GuardianConfig {
    /// Challenge TTL; elapsed time equal to this rejects.
    #[serde(default = "default_challenge_expiry")]
    pub challenge_expiry_seconds: i64,
}

const fn default_challenge_expiry() -> i64 {
    300
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            challenge_expiry_seconds: default_challenge_expiry(),
        }
    }
}

/// AGInt cognitive loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgintConfig {
    /// Pause between P-O-D-A cycles.
    #[serde(default = "default_cycle_delay")]
    pub cycle_delay_seconds: f64,

    /// Cooldown sleep after LLM enrichment failures.
    #[serde(default = "default_cooldown")]
    pub llm_failure_cooldown_seconds: f64,

    /// Cycle cap handed to delegated BDI runs.
    #[serde(default = "default_max_bdi_cycles")]
    pub max_bdi_cycles: u32,
}

const fn default_cycle_delay() -> f64 {
    5.0
}

const fn default_cooldown() -> f64 {
    30.0
}

const fn default_max_bdi_cycles() -> u32 {
    100
}

impl Default for AgintConfig {
    fn default() -> Self {
        Self {
            cycle_delay_seconds: default_cycle_delay(),
            llm_failure_cooldown_seconds: default_cooldown(),
            max_bdi_cycles: default_max_bdi_cycles(),
        }
    }
}

/// BDI executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BdiConfig {
    /// How many plans may be attempted per goal before it fails.
    #[serde(default = "default_max_plan_attempts")]
    pub max_plan_attempts: u32,

    /// Grace added to each action's estimated duration before timeout.
    #[serde(default = "default_timeout_grace")]
    pub action_timeout_grace_seconds: u64,
}

const fn default_max_plan_attempts() -> u32 {
    3
}

const fn default_timeout_grace() -> u64 {
    60
}

impl Default for BdiConfig {
    fn default() -> Self {
        Self {
            max_plan_attempts: default_max_plan_attempts(),
            action_timeout_grace_seconds: default_timeout_grace(),
        }
    }
}

/// Audit coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditConfig {
    /// Scheduler tick interval.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
}

const fn default_check_interval() -> u64 {
    300
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
        }
    }
}

/// Text generator endpoint configuration.
///
/// The provider behind this endpoint is opaque; mindx only posts prompts and
/// reads text back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// Generation endpoint URL. Empty disables the HTTP adapter.
    #[serde(default)]
    pub endpoint: String,

    /// Model identifier forwarded to the endpoint.
    #[serde(default = "default_model")]
    pub model: String,

    /// Provider-level request timeout.
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

fn default_model() -> String {
    "default".to_string()
}

const fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: default_model(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

/// Web search endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// Search endpoint URL. Empty disables the web search tool.
    #[serde(default)]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.data_dir, "data");
        assert_eq!(c.guardian.challenge_expiry_seconds, 300);
        assert_eq!(c.agint.max_bdi_cycles, 100);
        assert_eq!(c.bdi.max_plan_attempts, 3);
        assert_eq!(c.bdi.action_timeout_grace_seconds, 60);
        assert_eq!(c.logging.level, "info");
    }

    #[test]
    fn test_deserializes_from_empty_object() {
        let c: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(c.audit.check_interval_seconds, 300);
    }
}
