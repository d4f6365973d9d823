//! Gate configuration types and defaults.

use crate::error::GateError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_provider_name() -> String {
    "PlugCore".to_string()
}

fn default_download_url() -> String {
    "https://plugcore.io".to_string()
}

fn default_check_delay_ticks() -> u64 {
    100
}

fn default_tick_interval_ms() -> u64 {
    50 // 20 ticks per second
}

fn default_query_timeout_ms() -> u64 {
    5000
}

/// Settings for an [`AuthorizationGate`](crate::gate::AuthorizationGate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Name the provider is registered under
    #[serde(default = "default_provider_name")]
    pub provider_name: String,
    /// Where operators can download the provider; shown when it is missing
    #[serde(default = "default_download_url")]
    pub download_url: String,
    /// Host ticks to wait after enable before running the check
    #[serde(default = "default_check_delay_ticks")]
    pub check_delay_ticks: u64,
    /// Length of one host tick in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Upper bound on the authorization query in milliseconds
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            download_url: default_download_url(),
            check_delay_ticks: default_check_delay_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl GateConfig {
    /// Delay between enable and the authorization check
    pub fn check_delay(&self) -> Duration {
        Duration::from_millis(self.check_delay_ticks.saturating_mul(self.tick_interval_ms))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), GateError> {
        if self.provider_name.trim().is_empty() {
            return Err(GateError::InvalidConfig("provider_name cannot be empty".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(GateError::InvalidConfig(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.query_timeout_ms == 0 {
            return Err(GateError::InvalidConfig(
                "query_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
