//! Error types for the OneDrive provider

use bridge_traits::error::BridgeError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Status codes retried by the retry policy.
pub const TRANSIENT_STATUS_CODES: [u16; 4] = [500, 502, 503, 504];

/// OneDrive provider errors
#[derive(Error, Debug)]
pub enum OneDriveError {
    /// A required parameter was absent; no request was sent
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// A parameter was present but unusable
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The service answered with a non-success status
    #[error("OneDrive API error (status {status}): {body}")]
    Service { status: u16, body: String },

    /// No response was received
    #[error(transparent)]
    Transport(#[from] BridgeError),

    /// The source ended before the declared size was uploaded
    #[error(
        "Upload session abandoned after {uploaded_bytes} of {total_bytes} bytes (cleanup: {cleanup})"
    )]
    SessionAbandoned {
        uploaded_bytes: u64,
        total_bytes: u64,
        cleanup: CleanupOutcome,
    },

    /// The source stream failed while being read
    #[error("Source stream failed: {0}")]
    SourceStream(#[source] io::Error),

    /// The source yielded more bytes than declared
    #[error("Source yielded at least {received} bytes but {declared} were declared")]
    SizeMismatch { declared: u64, received: u64 },

    /// A success response could not be interpreted
    #[error("Failed to parse API response: {0}")]
    Parse(String),
}

impl OneDriveError {
    /// Whether the retry policy may retry this failure.
    ///
    /// Only service responses with a status in [`TRANSIENT_STATUS_CODES`]
    /// qualify. Transport failures carry no status and are surfaced directly.
    pub fn is_transient(&self) -> bool {
        matches!(self, OneDriveError::Service { status, .. } if TRANSIENT_STATUS_CODES.contains(status))
    }

    /// Status code of a service failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            OneDriveError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result of the best-effort DELETE issued when a session is abandoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The service confirmed the session was released
    Deleted { status: u16 },
    /// The DELETE was answered with an error status or never answered
    Failed(String),
}

impl CleanupOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, CleanupOutcome::Deleted { .. })
    }
}

impl fmt::Display for CleanupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupOutcome::Deleted { status } => write!(f, "session deleted (status {})", status),
            CleanupOutcome::Failed(reason) => write!(f, "session delete failed: {}", reason),
        }
    }
}

/// Result type for OneDrive operations
pub type Result<T> = std::result::Result<T, OneDriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        for status in TRANSIENT_STATUS_CODES {
            let error = OneDriveError::Service {
                status,
                body: String::new(),
            };
            assert!(error.is_transient(), "{} should be transient", status);
        }

        for status in [400, 401, 404, 409, 429, 501] {
            let error = OneDriveError::Service {
                status,
                body: String::new(),
            };
            assert!(!error.is_transient(), "{} should be terminal", status);
        }

        let transport = OneDriveError::Transport(BridgeError::Timeout("read".to_string()));
        assert!(!transport.is_transient());
        assert_eq!(transport.status(), None);
    }

    #[test]
    fn test_error_display() {
        let error = OneDriveError::Service {
            status: 404,
            body: r#"{"error":{"code":"itemNotFound"}}"#.to_string(),
        };
        assert_eq!(
            error.to_string(),
            r#"OneDrive API error (status 404): {"error":{"code":"itemNotFound"}}"#
        );

        let error = OneDriveError::SessionAbandoned {
            uploaded_bytes: 10,
            total_bytes: 30,
            cleanup: CleanupOutcome::Deleted { status: 204 },
        };
        assert_eq!(
            error.to_string(),
            "Upload session abandoned after 10 of 30 bytes (cleanup: session deleted (status 204))"
        );
        assert_eq!(
            OneDriveError::MissingParameter("access_token").to_string(),
            "Missing parameter: access_token"
        );
    }

    #[test]
    fn test_cleanup_outcome() {
        assert!(CleanupOutcome::Deleted { status: 204 }.is_deleted());
        let failed = CleanupOutcome::Failed("status 404".to_string());
        assert!(!failed.is_deleted());
        assert_eq!(failed.to_string(), "session delete failed: status 404");
    }
}
