//! Error types for the bridge

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The host has no type with this name
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// A type handle was used after failed resolution or after cleanup
    #[error("Type handle '{0}' is not resolved")]
    Unresolved(String),

    /// The host has no method with this name and signature
    #[error("Method not found: {class}.{name}{signature}")]
    MethodNotFound {
        /// Declaring type name
        class: String,
        /// Method name
        name: String,
        /// Method descriptor
        signature: String,
    },

    /// Binding the dispatch entry point into the host failed
    #[error("Failed to register native methods: {0}")]
    RegistrationFailed(String),

    /// A host call left an error pending
    #[error("Host call failed: {0}")]
    HostException(String),

    /// The host returned null where a proxy instance was expected
    #[error("Host returned no proxy instance")]
    NullProxy,

    /// The bridge's type handles were already cleaned up
    #[error("Bridge has been shut down")]
    ShutDown,
}
