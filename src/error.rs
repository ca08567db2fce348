//! Sync Error Types
//!
//! This module defines the error type shared by the repository, the
//! reconciler, and the background processor.
//!
//! # Error Categories
//!
//! - `Network` - transport-level failures talking to the remote service
//! - `Api` - the remote service answered with a non-success status
//! - `Serialization` - JSON encode/decode failures
//! - `Storage` - durable store failures
//! - `NoCurrentInspection` / `InspectionNotFound` / `ItemNotFound` -
//!   precondition failures; callers treat these as non-retryable no-ops
//! - `Config` - invalid or unreadable configuration
//!
//! # Usage
//!
//! ```rust
//! use fieldsync::error::SyncError;
//!
//! let error = SyncError::network("connection refused");
//! assert!(error.is_retryable());
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across task
//! boundaries.
use thiserror::Error;

/// Errors produced by the sync layer
#[derive(Debug, Error, Clone)]
pub enum SyncError {
    /// Transport-level network failure (connect, timeout, body read)
    #[error("Network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// The remote service answered with a non-success status code
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the service
        status: u16,
        /// Human-readable error message
        message: String,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// Durable store read or write failure
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// A mutation required a current inspection and none is selected
    #[error("No current inspection selected")]
    NoCurrentInspection,

    /// The referenced inspection does not exist in the repository
    #[error("Inspection not found: {id}")]
    InspectionNotFound {
        /// The inspection id that was looked up
        id: String,
    },

    /// The referenced item does not exist in any inspection
    #[error("Item not found: {id}")]
    ItemNotFound {
        /// The item id that was looked up
        id: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable error message
        message: String,
    },
}

impl SyncError {
    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new inspection-not-found error
    pub fn inspection_not_found(id: impl Into<String>) -> Self {
        Self::InspectionNotFound { id: id.into() }
    }

    /// Create a new item-not-found error
    pub fn item_not_found(id: impl Into<String>) -> Self {
        Self::ItemNotFound { id: id.into() }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the failed operation is worth retrying.
    ///
    /// Transport failures and server-side statuses (5xx, plus 429) are
    /// transient; everything else is a precondition or client error that a
    /// retry cannot fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}
