//! Example gated feature.
//!
//! Enables normally, then defers an authorization check by the configured
//! number of ticks. If the check fails, the gate has the host disable it.

use async_trait::async_trait;
use plugcore_gate::{
    AuthorizationGate, FeatureHandle, GateConfig, GateError, GateState, HostFeature, HostRuntime,
    LogLevel, ProviderRegistry,
};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Shared view of the gate created by the feature's latest enable
#[derive(Clone, Default)]
pub struct GateSlot(Arc<Mutex<Option<Arc<AuthorizationGate>>>>);

impl GateSlot {
    fn set(&self, gate: Arc<AuthorizationGate>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(gate);
        }
    }

    /// State of the current attempt, if one has started
    pub fn state(&self) -> Option<GateState> {
        self.0
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|gate| gate.state()))
    }
}

pub struct ExampleFeature {
    name: String,
    version: String,
    registry: Arc<ProviderRegistry>,
    config: GateConfig,
    slot: GateSlot,
}

impl ExampleFeature {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        registry: Arc<ProviderRegistry>,
        config: GateConfig,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            registry,
            config,
            slot: GateSlot::default(),
        }
    }

    pub fn gate_slot(&self) -> GateSlot {
        self.slot.clone()
    }
}

#[async_trait]
impl HostFeature for ExampleFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    async fn on_enable(&mut self, handle: &FeatureHandle, host: Arc<dyn HostRuntime>) -> Result<(), GateError> {
        // Resolved on every enable; the provider may have been installed since
        let provider = self.registry.resolve(&self.config.provider_name);
        let gate = Arc::new(AuthorizationGate::new(
            handle.clone(),
            provider,
            host,
            self.config.clone(),
        ));

        self.slot.set(gate.clone());
        gate.schedule_check(tokio::runtime::Handle::current())
    }

    async fn on_disable(&mut self, _handle: &FeatureHandle, host: Arc<dyn HostRuntime>) -> Result<(), GateError> {
        host.log(LogLevel::Info, &format!("{} disabled.", self.name));
        info!("👋 {} shut down", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugcore_gate::testing::{RecordingHost, ScriptedProvider};
    use plugcore_gate::FeatureWrapper;

    fn instant_config() -> GateConfig {
        GateConfig {
            check_delay_ticks: 0,
            ..GateConfig::default()
        }
    }

    #[tokio::test]
    async fn test_enable_schedules_deferred_check() {
        let registry = Arc::new(ProviderRegistry::new());
        let feature = ExampleFeature::new("ExamplePlugin", "1.0.0", registry, GateConfig::default());
        let slot = feature.gate_slot();
        let host = RecordingHost::new_on_main();
        let mut wrapper = FeatureWrapper::new(feature);

        wrapper.enable(host.clone()).await.unwrap();

        assert_eq!(slot.state(), Some(GateState::Start));
        assert_eq!(host.scheduled_delays(), vec![std::time::Duration::from_secs(5)]);
        assert!(host.logs().is_empty());
    }

    #[tokio::test]
    async fn test_missing_provider_disables_feature() {
        let registry = Arc::new(ProviderRegistry::new());
        let feature = ExampleFeature::new("ExamplePlugin", "1.0.0", registry, instant_config());
        let slot = feature.gate_slot();
        let host = RecordingHost::new_on_main();
        let mut wrapper = FeatureWrapper::new(feature);

        wrapper.enable(host.clone()).await.unwrap();
        host.run_scheduled();
        for _ in 0..100 {
            if slot.state().is_some_and(GateState::is_terminal) {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(slot.state(), Some(GateState::Disabled));
        assert_eq!(host.disable_count(), 1);
        assert_eq!(host.logs()[0].1, "PlugCore not found! Download from https://plugcore.io");
    }

    #[tokio::test]
    async fn test_provider_installed_after_first_enable_is_seen() {
        let registry = Arc::new(ProviderRegistry::new());
        let feature = ExampleFeature::new("ExamplePlugin", "1.0.0", registry.clone(), instant_config());
        let slot = feature.gate_slot();
        let host = RecordingHost::new_on_main();
        let mut wrapper = FeatureWrapper::new(feature);

        registry
            .register(ScriptedProvider::linked(true).authorizing("ExamplePlugin").into_arc())
            .unwrap();
        wrapper.enable(host.clone()).await.unwrap();
        host.run_scheduled();
        for _ in 0..100 {
            if slot.state().is_some_and(GateState::is_terminal) {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(slot.state(), Some(GateState::Enabled));
        assert_eq!(host.disable_count(), 0);
    }

    #[tokio::test]
    async fn test_disable_logs_shutdown_line() {
        let registry = Arc::new(ProviderRegistry::new());
        let host = RecordingHost::new_on_main();
        let mut wrapper = FeatureWrapper::new(ExampleFeature::new(
            "ExamplePlugin",
            "1.0.0",
            registry,
            GateConfig::default(),
        ));

        wrapper.disable(host.clone()).await.unwrap();

        assert_eq!(host.logs(), vec![(LogLevel::Info, "ExamplePlugin disabled.".to_string())]);
    }
}
