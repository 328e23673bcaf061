//! Batched image downloads with progress reporting.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::job::{CardRequest, StatusEvent};
use crate::metrics::IMAGE_FETCH_FAILURES;

use super::{FetchError, ImageBytes, ImageSource};

/// Default number of downloads in flight at once.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Downloads every image of a card list.
///
/// Requests are issued in batches of `batch_size`; a batch completes before the
/// next one starts. The first failure aborts the whole download.
pub struct ImageFetcher {
    source: Arc<dyn ImageSource>,
    batch_size: usize,
}

impl ImageFetcher {
    pub fn new(source: Arc<dyn ImageSource>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The source images are downloaded from.
    pub fn source(&self) -> Arc<dyn ImageSource> {
        Arc::clone(&self.source)
    }

    /// Downloads the image of every card, aligned with `cards` by index.
    ///
    /// Sends `Downloading images (k / N)` progress before the first request and
    /// after each completed request.
    pub async fn fetch_all(
        &self,
        cards: &[CardRequest],
        progress_tx: Option<&mpsc::Sender<StatusEvent>>,
    ) -> Result<Vec<ImageBytes>, FetchError> {
        let total = cards.len();
        let mut images: Vec<Option<ImageBytes>> = vec![None; total];
        let mut completed = 0;

        report(progress_tx, completed, total).await;

        for (batch_index, batch) in cards.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;
            debug!(
                batch = batch_index,
                first = offset,
                size = batch.len(),
                "Starting download batch"
            );

            let source = &self.source;
            let mut in_flight: FuturesUnordered<_> = batch
                .iter()
                .enumerate()
                .map(|(i, card)| async move { (offset + i, source.fetch(&card.url).await) })
                .collect();

            while let Some((index, result)) = in_flight.next().await {
                let data = result.map_err(|e| {
                    IMAGE_FETCH_FAILURES.inc();
                    warn!(index = index, error = %e, "Image download failed");
                    e
                })?;
                images[index] = Some(data);
                completed += 1;
                report(progress_tx, completed, total).await;
            }
        }

        images
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| FetchError::Internal("an image slot was never filled".to_string()))
    }
}

async fn report(progress_tx: Option<&mpsc::Sender<StatusEvent>>, completed: usize, total: usize) {
    if let Some(tx) = progress_tx {
        let _ = tx
            .send(StatusEvent::progress(format!(
                "Downloading images ({} / {})",
                completed, total
            )))
            .await;
    }
}
