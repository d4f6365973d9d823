//! The authorization gate
//!
//! One [`AuthorizationGate`] covers one startup attempt of one feature. It
//! asks the provider exactly once, maps the answer to an
//! [`AuthorizationResult`], and drives the feature into `Enabled` or
//! `Disabled`. Every failure fails closed.
//!
//! ## Ordering
//!
//! - provider availability, then link state, then the authorization query
//! - the query completes before the decision
//! - at most one decision per gate
//!
//! ## Threading
//!
//! The decision may be made on whatever thread the query completed on. When
//! that is not the host's main thread, the disable request is scheduled onto
//! the main thread instead of calling the host directly.

use crate::config::GateConfig;
use crate::error::{panic_message, GateError, ProviderError};
use crate::host::{FeatureHandle, HostRuntime, MainThreadTask};
use crate::outcome::{AuthorizationResult, DenialReason, GateState, LinkState};
use crate::provider::{AuthorizationProvider, ProviderAvailability};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Decides once whether a feature may run.
pub struct AuthorizationGate {
    feature: FeatureHandle,
    provider: ProviderAvailability,
    host: Arc<dyn HostRuntime>,
    config: GateConfig,
    state: AtomicU8,
}

impl AuthorizationGate {
    pub fn new(
        feature: FeatureHandle,
        provider: ProviderAvailability,
        host: Arc<dyn HostRuntime>,
        config: GateConfig,
    ) -> Self {
        Self {
            feature,
            provider,
            host,
            config,
            state: AtomicU8::new(GateState::Start as u8),
        }
    }

    pub fn feature(&self) -> &FeatureHandle {
        &self.feature
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn state(&self) -> GateState {
        GateState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Queries the provider and maps its answer. Never panics.
    ///
    /// Nothing is cached: every call re-reads the link state and, when
    /// linked, issues a fresh authorization query.
    pub async fn evaluate(&self) -> AuthorizationResult {
        let provider = match &self.provider {
            ProviderAvailability::Available(provider) => Arc::clone(provider),
            ProviderAvailability::Missing { name } => {
                debug!("Provider '{}' unavailable for {}", name, self.feature);
                return AuthorizationResult::ProviderMissing;
            }
        };

        let link = match Self::read_link_state(provider.as_ref()) {
            Ok(link) => link,
            Err(detail) => return AuthorizationResult::ProviderError(detail),
        };

        if !link.is_linked() {
            return AuthorizationResult::Unauthorized(DenialReason::NotLinked);
        }

        let query = AssertUnwindSafe(provider.is_plugin_authorized(self.feature.name())).catch_unwind();
        match tokio::time::timeout(self.config.query_timeout(), query).await {
            Ok(Ok(Ok(true))) => AuthorizationResult::Authorized,
            Ok(Ok(Ok(false))) => AuthorizationResult::Unauthorized(DenialReason::NotPurchased),
            Ok(Ok(Err(e))) => AuthorizationResult::ProviderError(e.to_string()),
            Ok(Err(panic_info)) => AuthorizationResult::ProviderError(format!(
                "provider panicked: {}",
                panic_message(panic_info)
            )),
            Err(_) => AuthorizationResult::ProviderError(ProviderError::Timeout.to_string()),
        }
    }

    fn read_link_state(provider: &dyn AuthorizationProvider) -> Result<LinkState, String> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| provider.is_server_linked())) {
            Ok(Ok(linked)) => Ok(LinkState(linked)),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic_info) => Err(format!("provider panicked: {}", panic_message(panic_info))),
        }
    }

    /// Applies a decision: logs it and, unless authorized, requests disablement.
    ///
    /// A gate that already reached a terminal state ignores further outcomes.
    pub fn on_outcome(&self, result: &AuthorizationResult) {
        let target = if result.is_authorized() {
            GateState::Enabled
        } else {
            GateState::Disabled
        };

        if !self.finish(target) {
            warn!("Ignoring second outcome '{}' for {}", result, self.feature);
            return;
        }

        let message = result.describe(self.feature.name(), &self.config.download_url);
        self.host.log(result.log_level(), &message);

        if result.requires_disable() {
            self.request_disable();
        }
    }

    /// Moves to a terminal state; false if one was already reached
    fn finish(&self, target: GateState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if GateState::from_u8(current).is_terminal() {
                return false;
            }
            match self.state.compare_exchange(current, target as u8, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn request_disable(&self) {
        if self.host.is_main_thread() {
            self.host.disable_feature(&self.feature);
            return;
        }

        let host = Arc::clone(&self.host);
        let feature = self.feature.clone();
        let task: MainThreadTask = Box::new(move || host.disable_feature(&feature));

        // A host that is already gone has nothing left to disable
        if let Err(e) = self.host.schedule_on_main_thread(task, Duration::ZERO) {
            debug!("Disable request for {} dropped: {}", self.feature, e);
        }
    }

    /// Runs the whole attempt: `Start -> Checking -> Enabled | Disabled`.
    ///
    /// A second call fails with [`GateError::AlreadyDecided`].
    pub async fn check(&self) -> Result<AuthorizationResult, GateError> {
        self.state
            .compare_exchange(
                GateState::Start as u8,
                GateState::Checking as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| GateError::AlreadyDecided(self.feature.to_string()))?;

        debug!("🔍 Checking authorization for {}", self.feature);
        let result = self.evaluate().await;
        self.on_outcome(&result);
        Ok(result)
    }

    /// Runs [`check`](Self::check) on a tokio worker.
    pub fn spawn_check(self: Arc<Self>) -> JoinHandle<Result<AuthorizationResult, GateError>> {
        tokio::spawn(async move { self.check().await })
    }

    /// Schedules the check on the main thread after the configured delay.
    ///
    /// The scheduled task hands the query off to `runtime`, so the main
    /// thread never blocks on the provider.
    pub fn schedule_check(self: Arc<Self>, runtime: tokio::runtime::Handle) -> Result<(), GateError> {
        let delay = self.config.check_delay();
        let gate = Arc::clone(&self);
        let task: MainThreadTask = Box::new(move || {
            runtime.spawn(async move {
                if let Err(e) = gate.check().await {
                    debug!("Authorization check skipped: {}", e);
                }
            });
        });

        self.host.schedule_on_main_thread(task, delay)?;
        info!("⏳ {} enabled - authorization check scheduled in {:?}", self.feature, delay);
        Ok(())
    }
}
