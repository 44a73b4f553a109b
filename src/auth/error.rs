//! Error and rejection types for session establishment.

use thiserror::Error;

/// A session could not be established or confirmed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Network-level failure talking to the service.
    #[error("network error during {stage} at {url}: {source}")]
    Network {
        /// Which step failed (`bootstrap`, `login`).
        stage: &'static str,
        /// The URL being requested.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The service root did not set the anti-forgery cookie.
    #[error("{url} did not set the `{cookie}` cookie")]
    MissingCsrfToken {
        /// The URL that was expected to set it.
        url: String,
        /// Name of the expected cookie.
        cookie: &'static str,
    },
}

impl AuthError {
    pub(crate) fn network(stage: &'static str, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            stage,
            url: url.into(),
            source,
        }
    }
}

/// Why the service refused a credentialed login.
///
/// Returned as data, never raised: the session stays usable for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginRejected {
    /// The account must be verified through a checkpoint page first.
    #[error("account verification required; verify at {verify_url}")]
    CheckpointRequired {
        /// Path returned by the service.
        checkpoint_url: String,
        /// Absolute URL the operator should open.
        verify_url: String,
    },

    /// The service returned a list of named errors.
    #[error("login rejected: {}", .0.join("; "))]
    Errors(Vec<String>),

    /// The payload matched no known failure shape.
    #[error("login failed with unrecognized response: {0}")]
    Unrecognized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_csrf_display() {
        let error = AuthError::MissingCsrfToken {
            url: "https://example.com/".to_string(),
            cookie: "csrftoken",
        };
        let msg = error.to_string();
        assert!(msg.contains("csrftoken"), "Expected cookie name in: {msg}");
        assert!(msg.contains("https://example.com/"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_login_rejected_errors_display_joins_messages() {
        let rejected = LoginRejected::Errors(vec!["bad password".into(), "slow down".into()]);
        assert_eq!(rejected.to_string(), "login rejected: bad password; slow down");
    }

    #[test]
    fn test_checkpoint_display_names_verify_url() {
        let rejected = LoginRejected::CheckpointRequired {
            checkpoint_url: "/challenge/1/".into(),
            verify_url: "https://example.com/challenge/1/".into(),
        };
        assert!(rejected.to_string().contains("https://example.com/challenge/1/"));
    }
}
