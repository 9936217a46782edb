//! Error types for the reconciler crate.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading the directory or settings failed.
    #[error(transparent)]
    Core(#[from] keygate_core::Error),

    /// Reconciliation failed.
    #[error("reconciliation failed: {reason}")]
    ReconcileFailed { reason: String },

    /// A sink refused an event.
    #[error("event sink error: {reason}")]
    SinkFailed { reason: String },

    /// Loop was stopped.
    #[error("polling loop stopped")]
    LoopStopped,

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a reconcile failed error.
    pub fn reconcile_failed(reason: impl Into<String>) -> Self {
        Self::ReconcileFailed {
            reason: reason.into(),
        }
    }

    /// Create a sink failed error.
    pub fn sink_failed(reason: impl Into<String>) -> Self {
        Self::SinkFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::reconcile_failed("something went wrong");
        assert!(err.to_string().contains("something went wrong"));
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err = Error::from(keygate_core::Error::unknown_device("DEV-1"));
        assert_eq!(err.to_string(), "device 'DEV-1' is not registered");
    }

    #[test]
    fn test_sink_failed() {
        let err = Error::sink_failed("receiver dropped");
        assert!(err.to_string().contains("receiver dropped"));
    }
}
