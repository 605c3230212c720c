//! Typed errors for the contact-discovery pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Note that the orchestrator
//! never lets any of these escape to its caller; they are converted into
//! error fields and notes on the returned result.

use thiserror::Error;

/// Errors that can occur during a discovery run.
#[derive(Debug, Error)]
pub enum ScavengeError {
    /// Chat model call failed
    #[error("chat model error: {0}")]
    Chat(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Search provider failed
    #[error("search provider error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Page fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Server answered with a non-success status
    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// Connection could not be established
    #[error("connect error for {url}")]
    Connect { url: String },

    /// Request timed out
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Any other transport-level failure
    #[error("request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FetchError {
    /// Whether a retry with backoff may succeed.
    ///
    /// Retryable: throttling and transient server statuses (429, 500, 502,
    /// 503, 504), timeouts, and connect failures. Everything else is
    /// terminal and is cached as a failed fetch.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            FetchError::Timeout { .. } | FetchError::Connect { .. } => true,
            FetchError::InvalidUrl { .. } | FetchError::Transport(_) => false,
        }
    }
}

/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, ScavengeError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            let err = FetchError::Status {
                status,
                url: "https://example.com".to_string(),
            };
            assert!(err.is_retryable(), "status {status} should be retryable");
        }
    }

    #[test]
    fn test_terminal_statuses() {
        for status in [400, 401, 403, 404, 410] {
            let err = FetchError::Status {
                status,
                url: "https://example.com".to_string(),
            };
            assert!(!err.is_retryable(), "status {status} should be terminal");
        }
    }

    #[test]
    fn test_timeout_and_connect_are_retryable() {
        let timeout = FetchError::Timeout {
            url: "https://example.com".to_string(),
        };
        let connect = FetchError::Connect {
            url: "https://example.com".to_string(),
        };
        assert!(timeout.is_retryable());
        assert!(connect.is_retryable());
    }

    #[test]
    fn test_invalid_url_is_terminal() {
        let err = FetchError::InvalidUrl {
            url: "not a url".to_string(),
        };
        assert!(!err.is_retryable());
    }
}
