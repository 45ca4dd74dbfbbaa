//! Error types for the location sharing engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::PermissionTier;

/// Why a permission precondition failed.
///
/// Callers use this to decide which guidance to render: a retry button for
/// `Denied`, a link to the system settings for `Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDeniedReason {
    /// The user declined the prompt; the OS may ask again later.
    Denied,
    /// The OS will not show the prompt again. Only the settings screen helps.
    Blocked,
    /// Background access was requested before foreground access was granted.
    ForegroundRequired,
}

/// A shared error type for the whole engine.
///
/// Only `PermissionDenied` is meant to reach the UI. Everything else is
/// produced by the collaborator ports and absorbed inside ticks, background
/// invocations and feed updates.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum NearbyError {
    /// A location permission tier is missing.
    #[error("Location permission denied: {tier:?} ({reason:?})")]
    PermissionDenied {
        tier: PermissionTier,
        reason: PermissionDeniedReason,
    },

    /// No position fix could be obtained (timeout, provider off, no signal).
    #[error("No position fix available")]
    NoFixAvailable,

    /// The remote document store could not be reached or rejected the call.
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    /// Locally persisted state could not be decoded.
    #[error("Corrupt local state: {0}")]
    CorruptLocalState(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host platform (OS location services, task scheduler) failed.
    #[error("Platform error: {0}")]
    Platform(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NearbyError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a PermissionDenied error
    pub fn permission_denied(tier: PermissionTier, reason: PermissionDeniedReason) -> Self {
        Self::PermissionDenied { tier, reason }
    }

    /// Creates a StoreUnavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Creates a CorruptLocalState error
    pub fn corrupt_local_state(message: impl Into<String>) -> Self {
        Self::CorruptLocalState(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a PermissionDenied error
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Check if this is a StoreUnavailable error
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Returns true for failures that are expected to clear up on their own:
    /// a missing fix or an unreachable store. The next tick retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NoFixAvailable | Self::StoreUnavailable(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for NearbyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for NearbyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for NearbyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for NearbyError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, NearbyError>`.
pub type Result<T> = std::result::Result<T, NearbyError>;
