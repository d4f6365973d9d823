//! Config-driven authorization provider.
//!
//! Stands in for PlugCore so the gate can be exercised end to end without a
//! licensing backend.

use crate::config::{FailureMode, ProviderSettings};
use async_trait::async_trait;
use plugcore_gate::{AuthorizationProvider, ProviderError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

pub struct ConfiguredProvider {
    name: String,
    linked: bool,
    authorized: HashSet<String>,
    latency: Duration,
    failure: Option<FailureMode>,
    link_checks: AtomicU64,
    queries: AtomicU64,
}

impl ConfiguredProvider {
    pub fn new(name: impl Into<String>, settings: &ProviderSettings) -> Self {
        Self {
            name: name.into(),
            linked: settings.linked,
            authorized: settings.authorized.iter().cloned().collect(),
            latency: Duration::from_millis(settings.latency_ms),
            failure: settings.failure,
            link_checks: AtomicU64::new(0),
            queries: AtomicU64::new(0),
        }
    }

    pub fn link_checks(&self) -> u64 {
        self.link_checks.load(Ordering::Relaxed)
    }

    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AuthorizationProvider for ConfiguredProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_server_linked(&self) -> Result<bool, ProviderError> {
        self.link_checks.fetch_add(1, Ordering::Relaxed);
        Ok(self.linked)
    }

    async fn is_plugin_authorized(&self, consumer_id: &str) -> Result<bool, ProviderError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        debug!("🔑 Authorization query for '{}'", consumer_id);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.failure {
            Some(mode) => Err(mode.to_error()),
            None => Ok(self.authorized.contains(consumer_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(linked: bool, authorized: &[&str]) -> ProviderSettings {
        ProviderSettings {
            linked,
            authorized: authorized.iter().map(|s| s.to_string()).collect(),
            ..ProviderSettings::default()
        }
    }

    #[tokio::test]
    async fn test_answers_from_settings() {
        let provider = ConfiguredProvider::new("PlugCore", &settings(true, &["Alpha"]));

        assert_eq!(provider.name(), "PlugCore");
        assert!(provider.is_server_linked().unwrap());
        assert!(provider.is_plugin_authorized("Alpha").await.unwrap());
        assert!(!provider.is_plugin_authorized("Beta").await.unwrap());
        assert_eq!(provider.queries(), 2);
    }

    #[tokio::test]
    async fn test_forced_failure() {
        let mut settings = settings(true, &["Alpha"]);
        settings.failure = Some(FailureMode::Network);
        let provider = ConfiguredProvider::new("PlugCore", &settings);

        let err = provider.is_plugin_authorized("Alpha").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
