//! Error types for the modeld client.

use std::time::Duration;

/// Errors surfaced by the client.
///
/// Variants carry owned strings rather than the underlying transport error so
/// that they can be cloned into published request snapshots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A readiness poll ran out of budget.
    #[error(
        "timed out after {elapsed_ms}ms waiting for status {expected:?} (last status {last_status})"
    )]
    Timeout {
        expected: Vec<u16>,
        last_status: u16,
        elapsed_ms: u64,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A JSON endpoint returned a body that could not be decoded.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl ClientError {
    /// Build a transport error from a reqwest failure.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        Self::Transport { message }
    }

    /// Build a timeout error for a readiness poll.
    pub fn poll_timeout(expected: &[u16], last_status: u16, elapsed: Duration) -> Self {
        Self::Timeout {
            expected: expected.to_vec(),
            last_status,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Timeout { last_status, .. } => Some(*last_status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_reqwest(err)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display_carries_status_and_body() {
        let err = ClientError::Http {
            status: 503,
            body: "model loading".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: model loading");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_poll_timeout() {
        let err = ClientError::poll_timeout(&[200], 503, Duration::from_millis(1500));
        assert_eq!(
            err,
            ClientError::Timeout {
                expected: vec![200],
                last_status: 503,
                elapsed_ms: 1500,
            }
        );
        assert!(err.to_string().contains("last status 503"));
    }
}
