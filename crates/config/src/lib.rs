//! Runtime configuration for feedpipe
//!
//! Settings are read from an optional YAML file and then overridden by
//! environment variables prefixed with `FEEDPIPE_` (nested keys separated by
//! `__`, e.g. `FEEDPIPE_OBSERVABILITY__LOG_LEVEL=debug`).

use figment::{Figment, providers::{Format, Yaml, Env, Serialized}};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Log levels accepted by `observability.log_level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Ambient parameters seeding each run's context
    pub context: ContextConfig,

    /// Execution tuning
    pub execution: ExecutionConfig,

    /// Logging settings
    pub observability: ObservabilityConfig,
}

impl RuntimeConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(RuntimeConfig::default()));

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::LoadError(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed("FEEDPIPE_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string (no environment overrides)
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(RuntimeConfig::default()))
            .merge(Yaml::string(yaml))
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let level = self.observability.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Unknown log level '{}'",
                self.observability.log_level
            )));
        }

        if self.execution.yield_every == 0 {
            return Err(ConfigError::ValidationError(
                "execution.yield_every must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parameters copied into every run context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Run in test mode
    pub test: bool,

    /// Verbose per-item logging
    pub verbose: bool,

    /// Named inputs available to `terminal` references
    pub inputs: BTreeMap<String, Value>,
}

/// Execution tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Raise errors for references that resolve to nothing instead of
    /// substituting `null`
    pub strict_resolution: bool,

    /// Number of items the async form processes between scheduler yields
    pub yield_every: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strict_resolution: false,
            yield_every: 1,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,

    /// Enable structured JSON logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}
