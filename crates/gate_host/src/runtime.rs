//! Main-thread host runtime.
//!
//! `MainThreadHost` is the `HostRuntime` the gate talks to. It remembers which
//! thread built it, and only that thread may mutate feature state. Work from
//! any other thread travels over a channel to the [`MainLoop`], which the
//! owning thread drives.

use dashmap::DashMap;
use plugcore_gate::{
    FeatureHandle, FeatureWrapper, GateError, HostFeature, HostRuntime, LogLevel, MainThreadTask,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, trace, warn};

type LoadedFeature = Arc<Mutex<FeatureWrapper<Box<dyn HostFeature>>>>;

/// A feature the host has enabled at least once
struct HostedFeature {
    handle: FeatureHandle,
    enabled: AtomicBool,
    feature: LoadedFeature,
}

/// Host runtime with a single main control thread.
pub struct MainThreadHost {
    main_thread: ThreadId,
    sender: mpsc::UnboundedSender<MainThreadTask>,
    features: DashMap<String, HostedFeature>,
    runtime: tokio::runtime::Handle,
    self_ref: Weak<MainThreadHost>,
}

/// Receiving end of the main-thread queue.
///
/// Dropping it tears the host down: later scheduling fails with
/// [`GateError::HostUnavailable`].
pub struct MainLoop {
    receiver: mpsc::UnboundedReceiver<MainThreadTask>,
    tick_interval: Duration,
}

impl MainThreadHost {
    /// Creates the host, binding the main thread to the calling thread.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(tick_interval: Duration) -> (Arc<Self>, MainLoop) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let runtime = tokio::runtime::Handle::current();
        let main_thread = std::thread::current().id();

        let host = Arc::new_cyclic(|self_ref| Self {
            main_thread,
            sender,
            features: DashMap::new(),
            runtime,
            self_ref: self_ref.clone(),
        });

        (host, MainLoop { receiver, tick_interval })
    }

    fn as_runtime(&self) -> Option<Arc<dyn HostRuntime>> {
        self.self_ref.upgrade().map(|host| host as Arc<dyn HostRuntime>)
    }

    /// Registers and enables a feature, running its `on_enable` hook.
    ///
    /// A failing hook leaves the feature registered but disabled.
    pub async fn enable_feature(&self, feature: Box<dyn HostFeature>) -> Result<FeatureHandle, GateError> {
        let host = self
            .as_runtime()
            .ok_or_else(|| GateError::HostUnavailable("host dropped".to_string()))?;

        let wrapper = FeatureWrapper::new(feature);
        let handle = wrapper.handle().clone();
        let name = handle.name().to_string();

        if self.is_enabled(&name) {
            return Err(GateError::Initialization(format!("{} is already enabled", name)));
        }

        let loaded: LoadedFeature = Arc::new(Mutex::new(wrapper));
        self.features.insert(
            name.clone(),
            HostedFeature {
                handle: handle.clone(),
                enabled: AtomicBool::new(true),
                feature: loaded.clone(),
            },
        );

        info!("🔧 Enabling feature: {}", handle);
        let result = loaded.lock().await.enable(host).await;
        if let Err(e) = result {
            error!("❌ Failed to enable {}: {}", handle, e);
            if let Some(entry) = self.features.get(&name) {
                entry.enabled.store(false, Ordering::Release);
            }
            return Err(e);
        }

        info!("✅ Feature enabled: {}", handle);
        Ok(handle)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.features
            .get(name)
            .map(|entry| entry.enabled.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Disables every feature that is still enabled and waits for the hooks.
    pub async fn shutdown_features(&self) {
        let Some(host) = self.as_runtime() else {
            return;
        };

        let active: Vec<(FeatureHandle, LoadedFeature)> = self
            .features
            .iter()
            .filter(|entry| entry.enabled.swap(false, Ordering::AcqRel))
            .map(|entry| (entry.handle.clone(), entry.feature.clone()))
            .collect();

        info!("🛑 Shutting down {} feature(s)", active.len());
        for (handle, feature) in active {
            if let Err(e) = feature.lock().await.disable(host.clone()).await {
                error!("❌ Feature shutdown failed for {}: {}", handle, e);
            }
        }
    }
}

impl HostRuntime for MainThreadHost {
    fn disable_feature(&self, feature: &FeatureHandle) {
        if !self.is_main_thread() {
            error!("Refusing to disable {} off the main thread", feature);
            return;
        }

        let Some(entry) = self.features.get(feature.name()) else {
            debug!("Disable requested for unknown feature {}", feature);
            return;
        };

        if entry.handle.instance_id() != feature.instance_id() {
            debug!("Disable request for stale instance of {}", feature);
            return;
        }

        if !entry.enabled.swap(false, Ordering::AcqRel) {
            return;
        }

        info!("🔌 Disabling feature: {}", feature);
        let loaded = entry.feature.clone();
        drop(entry);

        if let Some(host) = self.as_runtime() {
            let handle = feature.clone();
            self.runtime.spawn(async move {
                if let Err(e) = loaded.lock().await.disable(host).await {
                    error!("❌ on_disable failed for {}: {}", handle, e);
                }
            });
        }
    }

    fn schedule_on_main_thread(&self, task: MainThreadTask, delay: Duration) -> Result<(), GateError> {
        if self.sender.is_closed() {
            return Err(GateError::HostUnavailable("main loop stopped".to_string()));
        }

        if delay.is_zero() {
            return self
                .sender
                .send(task)
                .map_err(|_| GateError::HostUnavailable("main loop stopped".to_string()));
        }

        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(task).is_err() {
                debug!("Delayed main-thread task dropped: host stopped");
            }
        });
        Ok(())
    }

    fn is_main_thread(&self) -> bool {
        std::thread::current().id() == self.main_thread
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => error!(target: "host", "{}", message),
            LogLevel::Warn => warn!(target: "host", "{}", message),
            LogLevel::Info => info!(target: "host", "{}", message),
            LogLevel::Debug => debug!(target: "host", "{}", message),
            LogLevel::Trace => trace!(target: "host", "{}", message),
        }
    }
}

impl MainLoop {
    /// Runs every task that is ready right now
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Drives the queue on the current thread until `shutdown` resolves or
    /// `should_stop` returns true at a tick.
    ///
    /// Must be awaited on the thread that created the host, without spawning.
    pub async fn run_until<F, S>(&mut self, shutdown: F, mut should_stop: S)
    where
        F: Future<Output = ()>,
        S: FnMut() -> bool,
    {
        let mut ticker = tokio::time::interval(self.tick_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                task = self.receiver.recv() => match task {
                    Some(task) => task(),
                    None => break,
                },
                _ = ticker.tick() => {
                    if should_stop() {
                        break;
                    }
                }
            }
        }

        self.run_pending();
    }
}
