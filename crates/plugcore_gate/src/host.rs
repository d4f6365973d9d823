//! Host runtime interface consumed by the gate
//!
//! The host owns the feature lifecycle and the main control thread. The gate
//! never mutates host state directly; it goes through [`HostRuntime`], which
//! is what lets tests substitute a recording double for a real server.

use crate::error::GateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Log severity understood by the host's diagnostic sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Critical errors that may affect the feature
    Error,
    /// Conditions an operator should look at
    Warn,
    /// General informational messages
    Info,
    /// Detailed information for debugging
    Debug,
    /// Very detailed trace information
    Trace,
}

/// Stable identity of the feature asking for authorization.
///
/// `name` is the consumer id sent to the provider. `instance_id` is unique
/// per construction so two loads of the same feature can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureHandle {
    name: String,
    version: String,
    instance_id: uuid::Uuid,
}

impl FeatureHandle {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instance_id: uuid::Uuid::new_v4(),
        }
    }

    /// Consumer identity used for authorization queries
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn instance_id(&self) -> uuid::Uuid {
        self.instance_id
    }
}

impl fmt::Display for FeatureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Work redirected onto the host's main control thread
pub type MainThreadTask = Box<dyn FnOnce() + Send + 'static>;

/// Services the host exposes to a gated feature.
///
/// # Thread Safety
///
/// `disable_feature` is only sound on the main thread. Callers running
/// anywhere else must go through `schedule_on_main_thread`.
pub trait HostRuntime: Send + Sync {
    /// Disables the feature. Must be called from the main thread.
    fn disable_feature(&self, feature: &FeatureHandle);

    /// Runs `task` on the main thread after `delay`.
    ///
    /// Returns [`GateError::HostUnavailable`] once the host has shut down.
    fn schedule_on_main_thread(&self, task: MainThreadTask, delay: Duration) -> Result<(), GateError>;

    /// Whether the caller is currently on the main thread
    fn is_main_thread(&self) -> bool;

    /// Writes one diagnostic line to the host's log sink
    fn log(&self, level: LogLevel, message: &str);
}
