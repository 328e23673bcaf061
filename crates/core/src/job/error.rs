//! Error types for the print job module.

use thiserror::Error;

use crate::compositor::CompositionError;
use crate::fetcher::FetchError;

/// Errors that end a print job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The request was rejected before any work started.
    #[error("Invalid print request: {0}")]
    InvalidRequest(String),

    /// An image could not be downloaded. No partition was built.
    #[error("Image download failed: {0}")]
    Fetch(#[from] FetchError),

    /// A partition could not be composed. Earlier parts were delivered.
    #[error("Sheet composition failed for part {part}: {source}")]
    Composition {
        part: usize,
        #[source]
        source: CompositionError,
    },
}

impl JobError {
    /// Whether a `Failed` event was sent for this error.
    pub fn was_reported(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }

    /// Metric label for the job result.
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid",
            Self::Fetch(_) => "fetch_failed",
            Self::Composition { .. } => "compose_failed",
        }
    }
}
