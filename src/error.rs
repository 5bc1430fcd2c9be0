//! Relay error types
//!
//! A single taxonomy shared by every component. The HTTP layer maps each
//! variant to a status code (see `server::router`).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for relay operations
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed or missing request data (bad field, image, target, action)
    #[error("{0}")]
    InvalidInput(String),

    /// Requested resource does not exist yet
    #[error("{0}")]
    NotFound(String),

    /// Writing a screenshot to durable storage failed
    #[error("failed to write {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// QR code could not be produced for a validated target
    #[error("failed to create QR code: {0}")]
    QrEncode(String),

    /// Event could not be encoded to its wire form
    #[error("failed to encode event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure outside of request handling (bind, directory setup)
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RelayError {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        RelayError::InvalidInput(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        RelayError::NotFound(msg.into())
    }

    /// Whether the failure is the caller's fault rather than the server's
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::InvalidInput(_) | RelayError::NotFound(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, RelayError>;
