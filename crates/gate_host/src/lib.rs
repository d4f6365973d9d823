//! # PlugCore Gate Host
//!
//! Reference host for the PlugCore authorization gate. It enables an example
//! feature, defers the feature's authorization check by a number of ticks, and
//! drives a main-thread task loop. Any disable request the gate makes from a
//! worker thread is delivered through that loop.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (writes gate.toml if missing)
//! gate-host
//!
//! # Linked server, check immediately, exit once decided
//! gate-host --linked --check-delay-ticks 0 --exit-after-decision
//!
//! # Simulate PlugCore not being installed
//! gate-host --missing-provider --exit-after-decision
//! ```
//!
//! ## Signal Handling
//!
//! The host shuts down gracefully on:
//! - SIGINT (Ctrl+C)
//! - SIGTERM (Unix systems)

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod feature;
pub mod logging;
pub mod provider;
pub mod runtime;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Entry point shared by the `gate-host` binary.
///
/// Parses the CLI, sets up logging from the config file, then runs the
/// application until shutdown. Exits the process with code 1 on failure.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the file, before the full config is validated
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    args.apply_to(&mut config);

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{FailureMode, HostSettings, LoggingSettings, ProviderSettings};
