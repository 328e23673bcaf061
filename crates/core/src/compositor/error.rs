//! Error types for the compositor module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while composing a partition.
#[derive(Debug, Clone, Error)]
pub enum CompositionError {
    /// No compositor program is configured.
    #[error("No sheet compositor is configured")]
    NotConfigured,

    /// The compositor program could not be started.
    #[error("Failed to start compositor {path}: {reason}")]
    Spawn { path: PathBuf, reason: String },

    /// Reading or writing compositor input failed.
    #[error("Compositor I/O error: {0}")]
    Io(String),

    /// The compositor rejected its input or failed to build.
    #[error("Failed to build sheets: {reason}")]
    BuildFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The compositor finished without producing a document.
    #[error("Compositor produced no output")]
    EmptyOutput,

    /// The composing task itself failed.
    #[error("Internal compositor error: {0}")]
    Internal(String),
}

impl CompositionError {
    /// Creates a new build failed error with stderr output.
    pub fn build_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::BuildFailed {
            reason: reason.into(),
            stderr,
        }
    }
}

impl From<std::io::Error> for CompositionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
