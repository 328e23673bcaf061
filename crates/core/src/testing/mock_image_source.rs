//! Mock image source for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::fetcher::{FetchError, ImageBytes, ImageSource};

/// One entry of the request log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A fetch for the URL began.
    Started(String),
    /// A fetch for the URL returned, successfully or not.
    Finished(String),
}

/// Shared handle to everything a [`MockImageSource`] was asked for.
///
/// Stays usable after the source itself was moved into a wrapper.
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    events: Arc<Mutex<Vec<SourceEvent>>>,
}

impl RequestLog {
    fn push(&self, event: SourceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// Every start and finish, in the order they happened.
    pub fn events(&self) -> Vec<SourceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// URLs in the order their fetch started, failed ones included.
    pub fn urls(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SourceEvent::Started(url) => Some(url),
                SourceEvent::Finished(_) => None,
            })
            .collect()
    }
}

/// Mock implementation of the ImageSource trait.
///
/// Provides controllable behavior for testing:
/// - Deterministic bytes per URL (see [`MockImageSource::bytes_for`])
/// - Per-URL failures and delays
/// - A request log and the peak number of concurrent fetches
///
/// # Example
///
/// ```rust,ignore
/// use proxysheet_core::testing::MockImageSource;
///
/// let source = MockImageSource::new();
/// source.set_delay("https://img/0.png", Duration::from_millis(20));
/// source.fail_url("https://img/1.png", FetchError::Timeout { url: "https://img/1.png".into() });
///
/// let log = source.request_log();
/// // ... run a fetch ...
/// assert_eq!(log.urls().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockImageSource {
    log: RequestLog,
    images: Mutex<HashMap<String, ImageBytes>>,
    failures: Mutex<HashMap<String, FetchError>>,
    delays: Mutex<HashMap<String, Duration>>,
    default_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockImageSource {
    /// Create a new mock source that serves every URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bytes served for `url` unless overridden with `set_image`.
    pub fn bytes_for(url: &str) -> ImageBytes {
        ImageBytes::from(format!("image:{}", url).as_bytes())
    }

    /// Serve `data` for `url`.
    pub fn set_image(&self, url: &str, data: impl Into<ImageBytes>) {
        self.images
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), data.into());
    }

    /// Make every fetch of `url` fail with `error`.
    pub fn fail_url(&self, url: &str, error: FetchError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), error);
    }

    /// Delay fetches of `url`.
    pub fn set_delay(&self, url: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), delay);
    }

    /// Delay fetches of URLs without their own delay.
    pub fn set_default_delay(&self, delay: Duration) {
        *self.default_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Handle to the request log.
    pub fn request_log(&self) -> RequestLog {
        self.log.clone()
    }

    /// Highest number of fetches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn delay_for(&self, url: &str) -> Duration {
        let delays = self.delays.lock().unwrap_or_else(|e| e.into_inner());
        delays
            .get(url)
            .copied()
            .unwrap_or_else(|| *self.default_delay.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn respond(&self, url: &str) -> Result<ImageBytes, FetchError> {
        if let Some(error) = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
        {
            return Err(error.clone());
        }
        let images = self.images.lock().unwrap_or_else(|e| e.into_inner());
        Ok(images
            .get(url)
            .cloned()
            .unwrap_or_else(|| Self::bytes_for(url)))
    }
}

#[async_trait]
impl ImageSource for MockImageSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str) -> Result<ImageBytes, FetchError> {
        self.log.push(SourceEvent::Started(url.to_string()));
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self.delay_for(url);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.log.push(SourceEvent::Finished(url.to_string()));
        self.respond(url)
    }
}
