//! Configuration management for the gate host.
//!
//! This module handles loading and validation of host configuration from
//! TOML files. A missing file is replaced by a freshly written default.

use plugcore_gate::{GateConfig, ProviderError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_feature_name() -> String {
    "PlugCoreExamplePlugin".to_string()
}

fn default_feature_version() -> String {
    "1.0.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Authorization gate settings
    #[serde(default)]
    pub gate: GateConfig,
    /// Simulated authorization provider
    #[serde(default)]
    pub provider: ProviderSettings,
    /// Host and example feature settings
    #[serde(default)]
    pub host: HostSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Host-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Declared name of the example feature; also its consumer id
    #[serde(default = "default_feature_name")]
    pub feature_name: String,
    /// Declared version of the example feature
    #[serde(default = "default_feature_version")]
    pub feature_version: String,
    /// Stop once the gate has decided instead of waiting for a signal
    #[serde(default)]
    pub exit_after_decision: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            feature_name: default_feature_name(),
            feature_version: default_feature_version(),
            exit_after_decision: false,
        }
    }
}

/// Forced provider failure, for exercising the error path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    Timeout,
    Network,
    Malformed,
    Internal,
}

impl FailureMode {
    pub fn to_error(self) -> ProviderError {
        match self {
            Self::Timeout => ProviderError::Timeout,
            Self::Network => ProviderError::Network("connection refused".to_string()),
            Self::Malformed => ProviderError::Malformed("unexpected response body".to_string()),
            Self::Internal => ProviderError::Internal("internal provider fault".to_string()),
        }
    }
}

/// Settings for the built-in provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Whether the provider is installed at all
    #[serde(default = "default_true")]
    pub installed: bool,
    /// Whether this server is linked
    #[serde(default)]
    pub linked: bool,
    /// Consumer ids that have been purchased
    #[serde(default)]
    pub authorized: Vec<String>,
    /// Simulated round trip of an authorization query
    #[serde(default)]
    pub latency_ms: u64,
    /// Fail every authorization query this way
    #[serde(default)]
    pub failure: Option<FailureMode>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            installed: true,
            linked: false,
            authorized: Vec::new(),
            latency_ms: 0,
            failure: None,
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, writing the default if missing.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the merged configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.gate.validate().map_err(|e| e.to_string())?;

        if self.host.feature_name.trim().is_empty() {
            return Err("host.feature_name cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
