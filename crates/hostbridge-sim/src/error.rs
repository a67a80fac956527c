//! Errors surfaced by simulated managed-side calls

/// Outcome of a managed-side call that did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The receiver is not a proxy instance
    #[error("Not a proxy instance")]
    NotAProxy,

    /// The proxy was deactivated with `disableInterfaceProxy`
    #[error("Proxy instance has been disabled")]
    Disabled,

    /// Neither the proxy's interfaces nor the root type declare the method
    #[error("No method {name}{signature} on proxy")]
    NoSuchMethod {
        /// Method name
        name: String,
        /// Method descriptor
        signature: String,
    },

    /// The invoke callback was never bound with `register_natives`
    #[error("Native invoke callback is not registered")]
    NotLinked,

    /// The native side raised an error
    #[error("{class}: {message}")]
    Thrown {
        /// Error type name
        class: String,
        /// Detail message
        message: String,
    },
}

/// Result type for simulated managed-side calls
pub type SimResult<T> = Result<T, SimError>;
