//! Core error types for keygate operations.
//!
//! All errors are explicit, typed, and recoverable. Expected outcomes such as
//! a wrong activation code are ordinary variants, not panics.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for keygate operations.
#[derive(Debug, Error)]
pub enum Error {
    // Workflow errors
    #[error("device '{device_id}' cannot {action} while {from}")]
    InvalidTransition {
        device_id: String,
        from: String,
        action: String,
    },

    #[error("device '{device_id}' is not registered")]
    UnknownDevice { device_id: String },

    #[error("credential mismatch")]
    CredentialMismatch,

    // Storage errors
    #[error("store operation '{operation}' failed: {reason}")]
    StoreFailed { operation: String, reason: String },

    #[error("write to '{key}' lost the race {attempts} times")]
    Conflict { key: String, attempts: u32 },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    // Configuration errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("TOML parse error: {reason}")]
    TomlParseFailed { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Generic I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid transition error.
    pub fn invalid_transition(
        device_id: impl Into<String>,
        from: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            device_id: device_id.into(),
            from: from.into(),
            action: action.into(),
        }
    }

    /// Create an unknown device error.
    pub fn unknown_device(device_id: impl Into<String>) -> Self {
        Self::UnknownDevice {
            device_id: device_id.into(),
        }
    }

    /// Create a store failed error.
    pub fn store_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a write conflict error.
    pub fn conflict(key: impl Into<String>, attempts: u32) -> Self {
        Self::Conflict {
            key: key.into(),
            attempts,
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse_failed(reason: impl Into<String>) -> Self {
        Self::TomlParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error is an expected authorization outcome rather than
    /// an infrastructure failure.
    #[must_use]
    pub const fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::UnknownDevice { .. } | Self::CredentialMismatch
        )
    }
}
