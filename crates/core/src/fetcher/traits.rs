//! Trait definitions for the fetcher module.

use async_trait::async_trait;

use super::error::FetchError;
use super::ImageBytes;

/// A source that can download the bytes of a card image.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Downloads the image behind `url`.
    async fn fetch(&self, url: &str) -> Result<ImageBytes, FetchError>;
}
