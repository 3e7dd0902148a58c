//! Transport error types.

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised while sending a request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// Request URL could not be parsed
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Request exceeded the configured timeout
    #[error("request to {url} timed out")]
    Timeout {
        /// Target URL
        url: String,
    },

    /// Any other reqwest failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Could not connect to the host
    #[error("connection failed: {0}")]
    Connection(String),

    /// Response body was not the expected JSON
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Timeout {
            url: "http://example.com/login".to_string(),
        };
        assert_eq!(err.to_string(), "request to http://example.com/login timed out");
    }

    #[test]
    fn test_decode_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TransportError = json_err.into();
        assert!(err.to_string().starts_with("failed to decode response body"));
    }
}
