//! In-memory image cache with TTL eviction.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::metrics::{IMAGES_FETCHED, IMAGE_CACHE_ENTRIES};

use super::{FetchError, ImageBytes, ImageSource};

struct CacheEntry {
    data: ImageBytes,
    expires: Instant,
}

/// URL keyed image cache. Entries expire `ttl` after insertion.
#[derive(Clone)]
pub struct ImageCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ImageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the cached image if it has not expired yet.
    pub async fn get(&self, url: &str) -> Option<ImageBytes> {
        let entries = self.entries.read().await;
        entries
            .get(url)
            .filter(|entry| entry.expires > Instant::now())
            .map(|entry| Arc::clone(&entry.data))
    }

    /// Stores an image, replacing any previous entry for the URL.
    pub async fn insert(&self, url: &str, data: ImageBytes) {
        let mut entries = self.entries.write().await;
        let entry = CacheEntry {
            data,
            expires: Instant::now() + self.ttl,
        };
        if entries.insert(url.to_string(), entry).is_some() {
            debug!(url = url, "Replaced cached image");
        }
        IMAGE_CACHE_ENTRIES.set(entries.len() as i64);
    }

    /// Evicts expired entries and returns how many were removed.
    pub async fn prune(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires > now);
        let pruned = before - entries.len();
        IMAGE_CACHE_ENTRIES.set(entries.len() as i64);
        if pruned > 0 {
            info!(pruned = pruned, remaining = entries.len(), "Pruned image cache");
        }
        pruned
    }

    /// Number of entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Wraps an image source with an [`ImageCache`].
///
/// Successful downloads are cached; failures are not.
pub struct CachedImageSource<S: ImageSource> {
    inner: S,
    cache: ImageCache,
}

impl<S: ImageSource> CachedImageSource<S> {
    pub fn new(inner: S, cache: ImageCache) -> Self {
        Self { inner, cache }
    }

    /// The cache shared with this source.
    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }
}

#[async_trait]
impl<S: ImageSource> ImageSource for CachedImageSource<S> {
    fn name(&self) -> &str {
        "cached"
    }

    async fn fetch(&self, url: &str) -> Result<ImageBytes, FetchError> {
        if let Some(data) = self.cache.get(url).await {
            debug!(url = url, "Image cache hit");
            IMAGES_FETCHED.with_label_values(&["cache"]).inc();
            return Ok(data);
        }

        let data = self.inner.fetch(url).await?;
        self.cache.insert(url, Arc::clone(&data)).await;
        Ok(data)
    }
}
