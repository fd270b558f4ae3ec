//! Error types for spedup-client
//!
//! Errors are classified by how far they propagate:
//! - transient (retried on the next poll tick)
//! - per-file (the batch continues with the next file)
//! - batch fatal (authentication failure while polling)

use reqwest::StatusCode;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, reset, DNS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("API error {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Bearer token missing, expired or rejected (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Operation aborted through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid request assembled by the caller
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// IO error while reading a ledger file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// spedup-common error
    #[error("Common error: {0}")]
    Common(#[from] spedup_common::Error),
}

impl ClientError {
    /// True for 401-equivalent failures that must go back to re-authentication
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ClientError::Unauthorized => true,
            ClientError::Status { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }

    /// Build an error from a non-success response status and body
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            ClientError::Unauthorized
        } else {
            ClientError::Status { status, body }
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_401_maps_to_unauthorized() {
        let err = ClientError::from_status(StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, ClientError::Unauthorized));
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_other_statuses_are_not_auth_failures() {
        let err = ClientError::from_status(StatusCode::BAD_GATEWAY, "upstream".to_string());
        assert!(!err.is_auth_failure());
        assert_eq!(err.to_string(), "API error 502 Bad Gateway: upstream");

        assert!(!ClientError::Cancelled.is_auth_failure());
        assert!(!ClientError::Parse("x".to_string()).is_auth_failure());
    }
}
