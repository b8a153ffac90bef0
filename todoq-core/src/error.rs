//! Error types for todoq operations

use thiserror::Error;

/// Network-level failures talking to the remote todo service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Remote service unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Request timed out: {reason}")]
    Timeout { reason: String },

    #[error("Remote service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request aborted before completion: {reason}")]
    Aborted { reason: String },
}

/// Response bodies that could not be turned into todo records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed response body: {reason}")]
    Body { reason: String },
}

/// Input rejected before any request is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Todo title must not be empty")]
    EmptyTitle,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all todoq errors.
///
/// Every variant is `Clone` so a single failure can be stored on a cache
/// entry and handed to every observer waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl TodoError {
    /// True for failures raised locally before the network was involved.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Body {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TodoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.into())
    }
}

/// Result type alias for todoq operations.
pub type TodoResult<T> = Result<T, TodoError>;

// =============================================================================
// TESTS
// =============================================================================
