//! Error types for geoquake.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur while fetching and decoding the earthquake feed.
#[derive(Error, Debug)]
pub enum GeoquakeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid feed JSON
    #[error("Failed to parse earthquake feed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Feed returned a non-success status
    #[error("Failed to fetch earthquake data")]
    Api { status: u16 },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Event validation failed
    #[error("Invalid event data: {0}")]
    Validation(String),
}

impl GeoquakeError {
    /// HTTP status code, when the feed answered with one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
