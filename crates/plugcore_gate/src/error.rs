//! Error types for the authorization gate

/// Errors raised by the gate machinery itself.
///
/// An authorization *denial* is never a `GateError`; it is an
/// [`AuthorizationResult`](crate::outcome::AuthorizationResult) value.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The gate already made its decision for this startup attempt
    #[error("Authorization already decided for: {0}")]
    AlreadyDecided(String),

    /// The host has shut down and no longer accepts main-thread tasks
    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    /// A provider with the same name is already registered
    #[error("Provider already registered: {0}")]
    ProviderAlreadyRegistered(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Runtime error (panics, etc.)
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Feature initialization failed
    #[error("Initialization failed: {0}")]
    Initialization(String),
}

/// Errors reported by an authorization provider while answering a query.
///
/// The `Display` form is the operator-facing detail that ends up in
/// `"Authorization error: <detail>"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The query did not complete in time
    #[error("timeout")]
    Timeout,

    /// The provider could not reach its backend
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with something the provider could not parse
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Internal provider fault
    #[error("{0}")]
    Internal(String),

    /// The server instance is not linked to the provider
    #[error("server not linked")]
    NotLinked,
}

/// Converts a caught panic payload into a readable message.
pub(crate) fn panic_message(panic_info: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}
