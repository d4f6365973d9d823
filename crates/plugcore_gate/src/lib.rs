//! # PlugCore Gate
//!
//! Gates the enablement of a host feature (typically a game server plugin) on
//! a remote licensing check. The feature asks an external authorization
//! provider, PlugCore, whether the server is linked and whether the feature has
//! been purchased. Anything other than a clear "yes" disables the feature.
//!
//! ## Key Features
//!
//! - **Fail-closed**: a missing provider, an unlinked server, a denial, a query
//!   error and a provider panic all end in disablement, never in a host crash
//! - **One decision per attempt**: each startup runs exactly one query and makes
//!   exactly one decision
//! - **Thread-aware disablement**: disable requests made off the host's main
//!   thread are rescheduled onto it
//! - **Injected collaborators**: the provider and the host are trait objects,
//!   so both can be replaced by test doubles
//!
//! ## Architecture
//!
//! - **AuthorizationProvider**: the licensing service (link check + query)
//! - **ProviderRegistry**: resolves a provider by name, or reports it missing
//! - **HostRuntime**: what the host offers (disable, main-thread scheduling, logging)
//! - **HostFeature**: lifecycle hooks the host calls on a feature
//! - **AuthorizationGate**: evaluates, decides and drives the feature's terminal state
//!
//! ## Usage
//!
//! ```rust,no_run
//! use plugcore_gate::*;
//! use std::sync::Arc;
//!
//! async fn enable(host: Arc<dyn HostRuntime>, registry: &ProviderRegistry) -> Result<()> {
//!     let config = GateConfig::default();
//!     let gate = Arc::new(AuthorizationGate::new(
//!         FeatureHandle::new("ExamplePlugin", "1.0.0"),
//!         registry.resolve(&config.provider_name),
//!         host,
//!         config,
//!     ));
//!
//!     gate.schedule_check(tokio::runtime::Handle::current())
//! }
//! ```

pub mod config;
pub mod error;
pub mod feature;
pub mod gate;
pub mod host;
pub mod outcome;
pub mod provider;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::GateConfig;
pub use error::{GateError, ProviderError};
pub use feature::{FeatureWrapper, HostFeature};
pub use gate::AuthorizationGate;
pub use host::{FeatureHandle, HostRuntime, LogLevel, MainThreadTask};
pub use outcome::{AuthorizationResult, DenialReason, GateState, LinkState};
pub use provider::{AuthorizationProvider, ProviderAvailability, ProviderRegistry};

/// Crate version, reported by hosts at startup
pub const PLUGCORE_GATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the gate
pub type Result<T> = std::result::Result<T, GateError>;
