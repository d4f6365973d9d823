//! Command-line interface handling for the gate host.
//!
//! Uses the `clap` builder API. Flags override the matching config file
//! settings after the file is loaded.

use crate::config::AppConfig;
use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Force the simulated server link on (`Some(true)`) or off (`Some(false)`)
    pub linked: Option<bool>,
    /// Run as if the provider were not installed
    pub missing_provider: bool,
    /// Optional override for the deferred check delay
    pub check_delay_ticks: Option<u64>,
    /// Exit as soon as the gate has decided
    pub exit_after_decision: bool,
}

impl CliArgs {
    /// Parses command line arguments using clap.
    pub fn parse() -> Self {
        let matches = Command::new("PlugCore Gate Host")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Reference host that enables a feature behind a PlugCore authorization gate")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("gate.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("linked")
                    .long("linked")
                    .help("Treat this server as linked to PlugCore")
                    .action(clap::ArgAction::SetTrue)
                    .conflicts_with("unlinked"),
            )
            .arg(
                Arg::new("unlinked")
                    .long("unlinked")
                    .help("Treat this server as not linked to PlugCore")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("missing-provider")
                    .long("missing-provider")
                    .help("Start without the PlugCore provider installed")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("check-delay-ticks")
                    .long("check-delay-ticks")
                    .value_name("TICKS")
                    .help("Ticks to wait before the authorization check")
                    .value_parser(clap::value_parser!(u64)),
            )
            .arg(
                Arg::new("exit-after-decision")
                    .long("exit-after-decision")
                    .help("Exit once the authorization decision is made")
                    .action(clap::ArgAction::SetTrue),
            )
            .get_matches();

        let linked = if matches.get_flag("linked") {
            Some(true)
        } else if matches.get_flag("unlinked") {
            Some(false)
        } else {
            None
        };

        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("gate.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            linked,
            missing_provider: matches.get_flag("missing-provider"),
            check_delay_ticks: matches.get_one::<u64>("check-delay-ticks").copied(),
            exit_after_decision: matches.get_flag("exit-after-decision"),
        }
    }

    /// Applies the overrides to a loaded configuration.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json_format = true;
        }
        if let Some(linked) = self.linked {
            config.provider.linked = linked;
        }
        if self.missing_provider {
            config.provider.installed = false;
        }
        if let Some(ticks) = self.check_delay_ticks {
            config.gate.check_delay_ticks = ticks;
        }
        if self.exit_after_decision {
            config.host.exit_after_decision = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = CliArgs {
            config_path: PathBuf::from("test.toml"),
            log_level: Some("debug".to_string()),
            json_logs: true,
            linked: Some(true),
            missing_provider: true,
            check_delay_ticks: Some(0),
            exit_after_decision: true,
        };
        let mut config = AppConfig::default();

        args.apply_to(&mut config);

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert!(config.provider.linked);
        assert!(!config.provider.installed);
        assert_eq!(config.gate.check_delay_ticks, 0);
        assert!(config.host.exit_after_decision);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = AppConfig::default();
        config.provider.linked = true;

        CliArgs::default().apply_to(&mut config);

        assert!(config.provider.linked);
        assert!(config.provider.installed);
        assert_eq!(config.logging.level, "info");
    }
}
