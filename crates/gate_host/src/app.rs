//! Main application logic and lifecycle management.
//!
//! `Application` wires the host, the provider registry and the example
//! feature together, then drives the main-thread loop until shutdown.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::feature::{ExampleFeature, GateSlot};
use crate::logging::display_banner;
use crate::provider::ConfiguredProvider;
use crate::runtime::{MainLoop, MainThreadHost};
use crate::signals::wait_for_shutdown_signal;
use plugcore_gate::{GateState, ProviderRegistry};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Gate host application.
pub struct Application {
    config: AppConfig,
    host: Arc<MainThreadHost>,
    main_loop: MainLoop,
    registry: Arc<ProviderRegistry>,
}

impl Application {
    /// Loads configuration, applies CLI overrides and builds the host.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        args.apply_to(&mut config);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();
        Self::from_config(config)
    }

    /// Builds the application from an already validated configuration.
    ///
    /// Must be called on the thread that will later drive [`run`](Self::run).
    pub fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Arc::new(ProviderRegistry::new());
        if config.provider.installed {
            let provider = ConfiguredProvider::new(config.gate.provider_name.clone(), &config.provider);
            registry.register(Arc::new(provider))?;
        } else {
            warn!("⚠️ Starting without an authorization provider installed");
        }

        let tick = Duration::from_millis(config.gate.tick_interval_ms);
        let (host, main_loop) = MainThreadHost::new(tick);

        Ok(Self {
            config,
            host,
            main_loop,
            registry,
        })
    }

    /// Runs until a termination signal arrives.
    pub async fn run(self) -> Result<Option<GateState>, Box<dyn std::error::Error>> {
        let shutdown = async {
            if let Err(e) = wait_for_shutdown_signal().await {
                error!("❌ Failed to listen for shutdown signals: {e}");
            }
        };
        self.run_with_shutdown(shutdown).await
    }

    /// Enables the example feature and drives the main loop until
    /// `shutdown` resolves, or until the gate decides when
    /// `exit_after_decision` is set. Returns the gate's final state.
    pub async fn run_with_shutdown<F>(mut self, shutdown: F) -> Result<Option<GateState>, Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        self.log_configuration_summary();

        let feature = ExampleFeature::new(
            self.config.host.feature_name.clone(),
            self.config.host.feature_version.clone(),
            self.registry.clone(),
            self.config.gate.clone(),
        );
        let slot = feature.gate_slot();
        self.host.enable_feature(Box::new(feature)).await?;

        info!("✅ Host is running");
        if !self.config.host.exit_after_decision {
            info!("🛑 Press Ctrl+C to shut down");
        }

        let exit_after_decision = self.config.host.exit_after_decision;
        let host = self.host.clone();
        let name = self.config.host.feature_name.clone();
        let slot_for_loop = slot.clone();
        self.main_loop
            .run_until(shutdown, move || exit_after_decision && decision_settled(&slot_for_loop, &host, &name))
            .await;

        let final_state = slot.state();
        match final_state {
            Some(GateState::Enabled) => info!("🎉 Final decision: feature enabled"),
            Some(GateState::Disabled) => info!("🚫 Final decision: feature disabled"),
            _ => info!("⏳ Shut down before the authorization check completed"),
        }

        info!("🔌 Shutting down features...");
        self.host.shutdown_features().await;
        info!("✅ Gate host shutdown complete");

        Ok(final_state)
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!(
            "  🔌 Feature: {} v{}",
            self.config.host.feature_name, self.config.host.feature_version
        );
        info!(
            "  🔑 Provider: {} ({})",
            self.config.gate.provider_name,
            if self.registry.contains(&self.config.gate.provider_name) {
                "installed"
            } else {
                "missing"
            }
        );
        info!("  ⏱️ Check delay: {:?}", self.config.gate.check_delay());
        info!("  ⌛ Query timeout: {:?}", self.config.gate.query_timeout());
    }
}

/// A decision is settled once the gate is terminal and, if it disabled the
/// feature, the host has applied the disable.
fn decision_settled(slot: &GateSlot, host: &MainThreadHost, name: &str) -> bool {
    match slot.state() {
        Some(GateState::Enabled) => true,
        Some(GateState::Disabled) => !host.is_enabled(name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailureMode;

    fn config(installed: bool, linked: bool, authorized: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.gate.check_delay_ticks = 0;
        config.gate.tick_interval_ms = 5;
        config.host.exit_after_decision = true;
        config.provider.installed = installed;
        config.provider.linked = linked;
        if authorized {
            config.provider.authorized.push(config.host.feature_name.clone());
        }
        config
    }

    /// Runs until the gate decides; fails if it had to wait for the fallback shutdown
    async fn run_to_decision(config: AppConfig) -> Option<GateState> {
        let app = Application::from_config(config).unwrap();
        let started = std::time::Instant::now();

        let state = app
            .run_with_shutdown(tokio::time::sleep(Duration::from_secs(10)))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5), "decision never settled");
        state
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unlinked_server_disables_feature() {
        let state = run_to_decision(config(true, false, true)).await;
        assert_eq!(state, Some(GateState::Disabled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_linked_and_authorized_enables_feature() {
        let state = run_to_decision(config(true, true, true)).await;
        assert_eq!(state, Some(GateState::Enabled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_linked_but_not_purchased_disables_feature() {
        let state = run_to_decision(config(true, true, false)).await;
        assert_eq!(state, Some(GateState::Disabled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_missing_provider_disables_feature() {
        let state = run_to_decision(config(false, true, true)).await;
        assert_eq!(state, Some(GateState::Disabled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_provider_timeout_disables_feature() {
        let mut config = config(true, true, true);
        config.provider.failure = Some(FailureMode::Timeout);
        let state = run_to_decision(config).await;
        assert_eq!(state, Some(GateState::Disabled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_before_check_leaves_decision_pending() {
        let mut config = config(true, true, true);
        config.gate.check_delay_ticks = 100_000;
        config.host.exit_after_decision = false;
        let app = Application::from_config(config).unwrap();

        let state = app
            .run_with_shutdown(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(state, Some(GateState::Start));
    }
}
