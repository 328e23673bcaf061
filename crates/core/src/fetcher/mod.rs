//! Fetcher module for downloading card images.
//!
//! This module provides the `ImageSource` trait, an HTTP implementation, a
//! TTL cache that can wrap any source, and the `ImageFetcher` which downloads
//! a whole card list in bounded batches while reporting progress.
//!
//! # Example
//!
//! ```ignore
//! use proxysheet_core::fetcher::{HttpImageSource, ImageFetcher};
//!
//! let source = Arc::new(HttpImageSource::new(&FetcherConfig::default())?);
//! let fetcher = ImageFetcher::new(source, 8);
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(100);
//! let images = fetcher.fetch_all(&cards, Some(&tx)).await?;
//! assert_eq!(images.len(), cards.len());
//! ```

mod batch;
mod cache;
mod error;
mod http;
mod traits;

use std::sync::Arc;

pub use batch::{ImageFetcher, DEFAULT_BATCH_SIZE};
pub use cache::{CachedImageSource, ImageCache};
pub use error::FetchError;
pub use http::HttpImageSource;
pub use traits::ImageSource;

/// Raw bytes of one downloaded image, shared read-only for the rest of a job.
pub type ImageBytes = Arc<[u8]>;
