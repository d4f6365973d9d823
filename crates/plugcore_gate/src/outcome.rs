//! Authorization outcomes and the per-attempt gate state machine

use crate::host::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the running server instance is linked to the provider.
///
/// Read fresh from the provider on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState(pub bool);

impl LinkState {
    pub fn is_linked(self) -> bool {
        self.0
    }
}

/// Why a reachable provider refused the feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    /// The server instance is not linked to the provider
    NotLinked,
    /// The server is linked, but this feature has not been purchased
    NotPurchased,
}

/// Terminal result of one authorization evaluation.
///
/// Produced exactly once per evaluation and consumed exactly once to decide
/// whether the feature stays enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationResult {
    /// The provider allows the feature to run
    Authorized,
    /// The provider is reachable and says no
    Unauthorized(DenialReason),
    /// The provider is not installed on this host
    ProviderMissing,
    /// The query failed (timeout, malformed response, internal fault)
    ProviderError(String),
}

impl AuthorizationResult {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Every outcome other than `Authorized` disables the feature
    pub fn requires_disable(&self) -> bool {
        !self.is_authorized()
    }

    /// Severity of the single diagnostic line written for this outcome
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Authorized => LogLevel::Info,
            Self::Unauthorized(_) => LogLevel::Warn,
            Self::ProviderMissing | Self::ProviderError(_) => LogLevel::Error,
        }
    }

    /// Renders the operator-facing diagnostic for this outcome.
    ///
    /// Each failure kind gets its own wording so "not purchased", "provider
    /// not installed" and "provider fault" can be told apart in the logs.
    pub fn describe(&self, consumer: &str, download_url: &str) -> String {
        match self {
            Self::Authorized => format!("{consumer} enabled and authorized"),
            Self::Unauthorized(DenialReason::NotLinked) => {
                format!("Server not linked to PlugCore - {consumer} will be disabled")
            }
            Self::Unauthorized(DenialReason::NotPurchased) => {
                format!("Not authorized - {consumer} must be purchased")
            }
            Self::ProviderMissing => format!("PlugCore not found! Download from {download_url}"),
            Self::ProviderError(detail) => format!("Authorization error: {detail}"),
        }
    }
}

impl fmt::Display for AuthorizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorized => write!(f, "authorized"),
            Self::Unauthorized(DenialReason::NotLinked) => write!(f, "unauthorized (not linked)"),
            Self::Unauthorized(DenialReason::NotPurchased) => {
                write!(f, "unauthorized (not purchased)")
            }
            Self::ProviderMissing => write!(f, "provider missing"),
            Self::ProviderError(detail) => write!(f, "provider error ({detail})"),
        }
    }
}

/// Lifecycle of a single startup attempt.
///
/// `Start -> Checking -> {Enabled | Disabled}`; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum GateState {
    Start = 0,
    Checking = 1,
    Enabled = 2,
    Disabled = 3,
}

impl GateState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Enabled | Self::Disabled)
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Start,
            1 => Self::Checking,
            2 => Self::Enabled,
            _ => Self::Disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_authorized_keeps_feature() {
        assert!(!AuthorizationResult::Authorized.requires_disable());
        assert!(AuthorizationResult::Unauthorized(DenialReason::NotLinked).requires_disable());
        assert!(AuthorizationResult::Unauthorized(DenialReason::NotPurchased).requires_disable());
        assert!(AuthorizationResult::ProviderMissing.requires_disable());
        assert!(AuthorizationResult::ProviderError("timeout".into()).requires_disable());
    }

    #[test]
    fn test_messages_are_distinct_per_failure_kind() {
        let url = "https://plugcore.io";
        let outcomes = [
            AuthorizationResult::Unauthorized(DenialReason::NotLinked),
            AuthorizationResult::Unauthorized(DenialReason::NotPurchased),
            AuthorizationResult::ProviderMissing,
            AuthorizationResult::ProviderError("timeout".into()),
        ];

        let messages: Vec<String> = outcomes.iter().map(|o| o.describe("ExamplePlugin", url)).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }

        assert!(messages[0].contains("Server not linked"));
        assert!(messages[1].contains("must be purchased"));
        assert_eq!(messages[2], "PlugCore not found! Download from https://plugcore.io");
        assert_eq!(messages[3], "Authorization error: timeout");
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(AuthorizationResult::Authorized.log_level(), LogLevel::Info);
        assert_eq!(
            AuthorizationResult::Unauthorized(DenialReason::NotPurchased).log_level(),
            LogLevel::Warn
        );
        assert_eq!(AuthorizationResult::ProviderMissing.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_gate_state_roundtrip() {
        for state in [GateState::Start, GateState::Checking, GateState::Enabled, GateState::Disabled] {
            assert_eq!(GateState::from_u8(state as u8), state);
        }
        assert!(GateState::Enabled.is_terminal());
        assert!(!GateState::Checking.is_terminal());
    }
}
