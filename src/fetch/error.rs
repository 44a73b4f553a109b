//! Error types for the fetch module.
//!
//! Every failure of a single attempt is a [`FetchError`]; whether the retry
//! policy absorbs it is decided by its tag (see [`classify_error`]), not by
//! where it was raised.

use thiserror::Error;
use tracing::instrument;

/// Errors that can occur while fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, reset mid-body, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP status other than 404.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body was shorter or longer than the declared `Content-Length`.
    #[error("partial content fetching {url}: expected {expected_bytes} bytes, got {received_bytes}")]
    PartialContent {
        /// The URL whose body was truncated.
        url: String,
        /// Declared length.
        expected_bytes: u64,
        /// Bytes actually received.
        received_bytes: u64,
    },

    /// The provided URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// An interrupt was signalled while the fetch was in progress.
    #[error("interrupted while fetching {url}")]
    Interrupted {
        /// The URL being fetched.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Maps a reqwest error to [`FetchError::Timeout`] or [`FetchError::Network`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a partial-content error.
    pub fn partial_content(url: impl Into<String>, expected_bytes: u64, received_bytes: u64) -> Self {
        Self::PartialContent {
            url: url.into(),
            expected_bytes,
            received_bytes,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an interrupt error.
    pub fn interrupted(url: impl Into<String>) -> Self {
        Self::Interrupted { url: url.into() }
    }

    /// Whether the retry policy should absorb this failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        classify_error(self) == FailureType::Transient
    }
}

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Retried automatically, then escalated.
    Transient,

    /// Returned to the caller immediately; retrying cannot help.
    Terminal,

    /// Unwinds the whole fetch, bypassing escalation.
    Interrupted,
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Network | Transient |
/// | Timeout | Transient |
/// | HttpStatus (any non-404) | Transient |
/// | PartialContent | Transient |
/// | InvalidUrl | Terminal |
/// | Interrupted | Interrupted |
#[instrument(level = "trace")]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Network { .. }
        | FetchError::Timeout { .. }
        | FetchError::HttpStatus { .. }
        | FetchError::PartialContent { .. } => FailureType::Transient,
        FetchError::InvalidUrl { .. } => FailureType::Terminal,
        FetchError::Interrupted { .. } => FailureType::Interrupted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_content_display() {
        let error = FetchError::partial_content("https://example.com/a", 500, 480);
        let msg = error.to_string();
        assert!(msg.contains("500"), "Expected declared length in: {msg}");
        assert!(msg.contains("480"), "Expected received length in: {msg}");
    }

    #[test]
    fn test_classify_http_status_transient() {
        for status in [400, 403, 429, 500, 503] {
            let error = FetchError::http_status("https://example.com", status);
            assert_eq!(classify_error(&error), FailureType::Transient, "status {status}");
        }
    }

    #[test]
    fn test_classify_timeout_and_partial_transient() {
        assert!(FetchError::timeout("u").is_retryable());
        assert!(FetchError::partial_content("u", 2, 1).is_retryable());
    }

    #[test]
    fn test_classify_invalid_url_terminal() {
        let error = FetchError::invalid_url("not a url");
        assert_eq!(classify_error(&error), FailureType::Terminal);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_classify_interrupted() {
        let error = FetchError::interrupted("https://example.com");
        assert_eq!(classify_error(&error), FailureType::Interrupted);
        assert!(!error.is_retryable());
    }
}
