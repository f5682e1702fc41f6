//! Error types for sigveil

use thiserror::Error;

/// Result type for sigveil operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sigveil
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to launch Chrome
    #[error("Failed to launch Chrome: {0}")]
    Launch(String),

    /// Transport error
    #[error("Transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// CDP protocol error
    #[error("CDP error in {method}: {message} (code {code})")]
    Cdp {
        method: String,
        code: i64,
        message: String,
    },

    /// CDP error without method context
    #[error("CDP error: {0}")]
    CdpSimple(String),

    /// Navigation error
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Chrome not found
    #[error("Chrome not found")]
    ChromeNotFound,

    /// The host environment does not expose the binding an override targets
    #[error("Signal binding not found: {binding}")]
    SignalNotFound { binding: String },

    /// A signal read back from a page does not carry the spoofed value
    #[error("Signal {signal} mismatch: expected {expected}, got {actual}")]
    SignalMismatch {
        signal: String,
        expected: String,
        actual: String,
    },
}

impl Error {
    /// Create a transport error with context
    pub fn transport(context: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
            source: None,
        }
    }

    /// Create a transport error with IO source
    pub fn transport_io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source: Some(source),
        }
    }

    /// Create a CDP error with full context
    pub fn cdp(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Cdp {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a missing-binding error
    pub fn not_found(binding: impl Into<String>) -> Self {
        Self::SignalNotFound {
            binding: binding.into(),
        }
    }

    /// Create a signal mismatch error
    pub fn mismatch(
        signal: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::SignalMismatch {
            signal: signal.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Check if this error means a targeted binding is absent from the host
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::SignalNotFound { .. })
    }
}
