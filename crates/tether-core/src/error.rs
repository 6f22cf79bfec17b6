//! Error types for Tether.

use thiserror::Error;

/// A shared error type for the whole session engine.
///
/// Transport, storage and timeout failures are all recovered inside the
/// session manager; this type mostly travels between the adapters and the
/// manager, and out of the explicit user commands (`clear_history`, `refresh`).
#[derive(Error, Debug, Clone)]
pub enum TetherError {
    /// Network failure or non-2xx response from the session API
    #[error("Transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Expired or unknown handle
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Persistent handle store unavailable or inconsistent on read-back
    #[error("Storage error: {0}")]
    Storage(String),

    /// No response within the configured bound
    #[error("Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TetherError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error without an HTTP status
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a Transport error for a non-2xx HTTP status
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a NotFound error for a session handle
    pub fn session_not_found(handle: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Session",
            id: handle.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Timeout error
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout {
            after_ms: after.as_millis() as u64,
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TetherError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TetherError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TetherError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, TetherError>`.
pub type Result<T> = std::result::Result<T, TetherError>;
