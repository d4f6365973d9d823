//! Feature lifecycle trait and panic-isolating wrapper

use crate::error::{panic_message, GateError};
use crate::host::{FeatureHandle, HostRuntime};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Lifecycle hooks a host invokes on a feature.
///
/// The host calls `on_enable` when the feature starts and `on_disable` when it
/// stops, including when the authorization gate asks for disablement.
#[async_trait]
pub trait HostFeature: Send + Sync + 'static {
    /// Returns the declared name of this feature
    fn name(&self) -> &str;

    /// Returns the version string of this feature
    fn version(&self) -> &str;

    /// Called when the host enables the feature
    async fn on_enable(&mut self, handle: &FeatureHandle, host: Arc<dyn HostRuntime>) -> Result<(), GateError>;

    /// Called when the host disables the feature
    async fn on_disable(&mut self, _handle: &FeatureHandle, _host: Arc<dyn HostRuntime>) -> Result<(), GateError> {
        Ok(())
    }
}

#[async_trait]
impl<T: HostFeature + ?Sized> HostFeature for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn version(&self) -> &str {
        (**self).version()
    }

    async fn on_enable(&mut self, handle: &FeatureHandle, host: Arc<dyn HostRuntime>) -> Result<(), GateError> {
        (**self).on_enable(handle, host).await
    }

    async fn on_disable(&mut self, handle: &FeatureHandle, host: Arc<dyn HostRuntime>) -> Result<(), GateError> {
        (**self).on_disable(handle, host).await
    }
}

/// Wraps a [`HostFeature`] so panics in its hooks surface as
/// [`GateError::Runtime`] instead of unwinding into the host.
pub struct FeatureWrapper<T: HostFeature> {
    inner: T,
    handle: FeatureHandle,
}

impl<T: HostFeature> FeatureWrapper<T> {
    pub fn new(inner: T) -> Self {
        let handle = FeatureHandle::new(inner.name(), inner.version());
        Self { inner, handle }
    }

    /// Identity assigned to this loaded instance
    pub fn handle(&self) -> &FeatureHandle {
        &self.handle
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn panic_to_error(hook: &str, panic_info: Box<dyn std::any::Any + Send>) -> GateError {
        GateError::Runtime(format!("Feature panicked in {}: {}", hook, panic_message(panic_info)))
    }

    pub async fn enable(&mut self, host: Arc<dyn HostRuntime>) -> Result<(), GateError> {
        match AssertUnwindSafe(self.inner.on_enable(&self.handle, host)).catch_unwind().await {
            Ok(result) => result,
            Err(panic_info) => Err(Self::panic_to_error("on_enable", panic_info)),
        }
    }

    pub async fn disable(&mut self, host: Arc<dyn HostRuntime>) -> Result<(), GateError> {
        match AssertUnwindSafe(self.inner.on_disable(&self.handle, host)).catch_unwind().await {
            Ok(result) => result,
            Err(panic_info) => Err(Self::panic_to_error("on_disable", panic_info)),
        }
    }
}
