//! Error types for profile extraction.

use thiserror::Error;

/// A response body could not be projected into a profile record.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The body is not valid JSON.
    #[error("profile response for {subject} is not valid JSON: {source}")]
    InvalidJson {
        /// Username the body was fetched for.
        subject: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The JSON does not have the expected profile shape.
    #[error("profile response for {subject} has an unexpected shape: {source}")]
    Schema {
        /// Username the body was fetched for.
        subject: String,
        /// Which key was missing or mistyped.
        #[source]
        source: serde_json::Error,
    },
}

impl ExtractionError {
    /// Username the failed extraction was for.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::InvalidJson { subject, .. } | Self::Schema { subject, .. } => subject,
        }
    }
}
