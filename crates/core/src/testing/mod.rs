//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external collaborators
//! of the print pipeline, so jobs can be run end to end without network
//! access or a compositor program.
//!
//! # Example
//!
//! ```rust,ignore
//! use proxysheet_core::testing::{fixtures, MockCompositorFactory, MockImageSource};
//!
//! let source = Arc::new(MockImageSource::new());
//! let factory = Arc::new(MockCompositorFactory::new());
//! let mut runner = PrintJobRunner::new(source, factory.clone());
//!
//! let request = fixtures::request(&[10, 5], Some(1));
//! runner.run(&request, &tx).await?;
//! assert_eq!(factory.created(), 2);
//! ```

mod mock_compositor;
mod mock_image_source;

pub use mock_compositor::{MockCompositorFactory, RecordedCompositor};
pub use mock_image_source::{MockImageSource, RequestLog, SourceEvent};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::job::{CardRequest, PrintJobRequest};

    /// URL of the `index`-th fixture card.
    pub fn card_url(index: usize) -> String {
        format!("https://img/{}.png", index)
    }

    /// One card per count, with URLs from [`card_url`].
    pub fn cards(counts: &[u32]) -> Vec<CardRequest> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| CardRequest::new(card_url(i), count))
            .collect()
    }

    /// A request for [`cards`] with an optional split.
    pub fn request(counts: &[u32], split: Option<usize>) -> PrintJobRequest {
        PrintJobRequest {
            cards: cards(counts),
            split,
        }
    }
}
