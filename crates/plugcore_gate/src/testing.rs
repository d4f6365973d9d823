//! Test doubles for the host and the provider.
//!
//! Available to this crate's tests and, behind the `testing` feature, to
//! downstream crates.

use crate::error::{GateError, ProviderError};
use crate::host::{FeatureHandle, HostRuntime, LogLevel, MainThreadTask};
use crate::provider::AuthorizationProvider;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Host that records every call instead of acting on it.
///
/// Whether callers are "on the main thread" is fixed at construction, which
/// lets tests exercise both delivery paths from a single test thread.
pub struct RecordingHost {
    on_main_thread: bool,
    shut_down: AtomicBool,
    disabled: Mutex<Vec<FeatureHandle>>,
    scheduled: Mutex<Vec<(MainThreadTask, Duration)>>,
    delays: Mutex<Vec<Duration>>,
    logs: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingHost {
    fn new(on_main_thread: bool) -> Arc<Self> {
        Arc::new(Self {
            on_main_thread,
            shut_down: AtomicBool::new(false),
            disabled: Mutex::new(Vec::new()),
            scheduled: Mutex::new(Vec::new()),
            delays: Mutex::new(Vec::new()),
            logs: Mutex::new(Vec::new()),
        })
    }

    /// Every caller is treated as running on the main thread
    pub fn new_on_main() -> Arc<Self> {
        Self::new(true)
    }

    /// Every caller is treated as running on a worker
    pub fn new_off_main() -> Arc<Self> {
        Self::new(false)
    }

    /// Rejects all further scheduling, as a torn-down host would
    pub fn shut_down(&self) {
        self.shut_down.store(true, Ordering::Release);
        self.scheduled.lock().unwrap().clear();
    }

    /// Runs every pending scheduled task, ignoring delays
    pub fn run_scheduled(&self) -> usize {
        let tasks: Vec<_> = std::mem::take(&mut *self.scheduled.lock().unwrap());
        let count = tasks.len();
        for (task, _) in tasks {
            task();
        }
        count
    }

    pub fn disable_count(&self) -> usize {
        self.disabled.lock().unwrap().len()
    }

    pub fn disabled(&self) -> Vec<FeatureHandle> {
        self.disabled.lock().unwrap().clone()
    }

    /// Tasks scheduled and not yet run
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }

    /// Delays of every task ever scheduled, in order
    pub fn scheduled_delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<(LogLevel, String)> {
        self.logs.lock().unwrap().clone()
    }
}

impl HostRuntime for RecordingHost {
    fn disable_feature(&self, feature: &FeatureHandle) {
        self.disabled.lock().unwrap().push(feature.clone());
    }

    fn schedule_on_main_thread(&self, task: MainThreadTask, delay: Duration) -> Result<(), GateError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(GateError::HostUnavailable("recording host shut down".to_string()));
        }
        self.delays.lock().unwrap().push(delay);
        self.scheduled.lock().unwrap().push((task, delay));
        Ok(())
    }

    fn is_main_thread(&self) -> bool {
        self.on_main_thread
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.logs.lock().unwrap().push((level, message.to_string()));
    }
}

/// Provider with scripted answers that counts the calls it receives.
pub struct ScriptedProvider {
    name: String,
    linked: Result<bool, ProviderError>,
    authorized: HashSet<String>,
    failure: Option<ProviderError>,
    latency: Option<Duration>,
    panics: bool,
    link_checks: AtomicUsize,
    queries: AtomicUsize,
}

impl ScriptedProvider {
    pub fn linked(linked: bool) -> Self {
        Self {
            name: "PlugCore".to_string(),
            linked: Ok(linked),
            authorized: HashSet::new(),
            failure: None,
            latency: None,
            panics: false,
            link_checks: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    /// The link check itself fails
    pub fn link_error(error: ProviderError) -> Self {
        Self {
            linked: Err(error),
            ..Self::linked(false)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn authorizing(mut self, consumer_id: impl Into<String>) -> Self {
        self.authorized.insert(consumer_id.into());
        self
    }

    /// Authorization queries fail with `error`
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Authorization queries panic
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn link_checks(&self) -> usize {
        self.link_checks.load(Ordering::SeqCst)
    }

    pub fn authorization_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_server_linked(&self) -> Result<bool, ProviderError> {
        self.link_checks.fetch_add(1, Ordering::SeqCst);
        self.linked.clone()
    }

    async fn is_plugin_authorized(&self, consumer_id: &str) -> Result<bool, ProviderError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.panics {
            panic!("scripted provider fault");
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(self.authorized.contains(consumer_id))
    }
}
