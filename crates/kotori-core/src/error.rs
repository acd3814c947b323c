//! Unified error types shared by the kotori crates.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in channel/transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Frame send failed.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// No response arrived within the read timeout.
    #[error("timed out waiting for a frame")]
    Timeout,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a `ConnectionClosed` error with the given reason.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Errors surfaced to callers of the API channel.
///
/// Transport faults are fatal to the in-flight call and never retried here;
/// retry policy, if any, belongs to the caller.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// A write/read/connection fault on the API channel.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response payload did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The gateway reported an application-level failure.
    ///
    /// `code` is the gateway's error code string; `message` carries its
    /// human-readable wording. The response body is discarded whenever the
    /// error indicator is present.
    #[error("gateway error {code}: {message}")]
    Remote {
        /// Gateway-reported error code.
        code: String,
        /// Gateway-reported error message.
        message: String,
    },
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
