//! Error types for the fetcher module.

use thiserror::Error;

/// Errors that can occur while downloading an image.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("Failed to download {url}: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Failed to download {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request timed out.
    #[error("Timed out downloading {url}")]
    Timeout { url: String },

    /// The fetcher itself failed.
    #[error("Internal fetch error: {0}")]
    Internal(String),
}

impl FetchError {
    /// Creates a new request error.
    pub fn request(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Maps a reqwest error for the given URL.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::request(url, err.to_string())
        }
    }
}
