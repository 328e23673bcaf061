//! Print job runner implementation.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compositor::{CompositionError, CompositorFactory, CompositorGuard};
use crate::config::Config;
use crate::fetcher::{ImageBytes, ImageFetcher, ImageSource, DEFAULT_BATCH_SIZE};
use crate::metrics::{COMPOSE_DURATION, PARTITIONS, PRINT_JOBS};
use crate::partition::{job_size, partition, Partition};

use super::error::JobError;
use super::types::{JobPhase, JobSummary, PrintJobRequest, StatusEvent};

/// Default number of cards on one printed page.
pub const DEFAULT_PAGE_CAPACITY: usize = 9;

/// Drives print jobs through fetch, partition and compose.
///
/// One runner handles one job at a time; `run` takes `&mut self` so a second
/// job cannot start while one is in flight.
pub struct PrintJobRunner {
    fetcher: ImageFetcher,
    factory: Arc<dyn CompositorFactory>,
    page_capacity: usize,
    phase: JobPhase,
}

impl PrintJobRunner {
    /// Create a runner with default batch size and page capacity.
    pub fn new(source: Arc<dyn ImageSource>, factory: Arc<dyn CompositorFactory>) -> Self {
        Self {
            fetcher: ImageFetcher::new(source, DEFAULT_BATCH_SIZE),
            factory,
            page_capacity: DEFAULT_PAGE_CAPACITY,
            phase: JobPhase::Idle,
        }
    }

    /// Create a runner using the fetcher and job sections of `config`.
    pub fn from_config(
        config: &Config,
        source: Arc<dyn ImageSource>,
        factory: Arc<dyn CompositorFactory>,
    ) -> Self {
        Self::new(source, factory)
            .with_batch_size(config.fetcher.batch_size)
            .with_page_capacity(config.job.page_capacity)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        let source = self.fetcher.source();
        self.fetcher = ImageFetcher::new(source, batch_size);
        self
    }

    pub fn with_page_capacity(mut self, page_capacity: usize) -> Self {
        self.page_capacity = page_capacity.max(1);
        self
    }

    /// Phase of the current or most recent job.
    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Run one print job, sending progress and results to `events`.
    ///
    /// Invalid requests are rejected before any work and produce no events.
    /// Otherwise every outcome ends with either a `Success` for the last part
    /// or a single `Failed`. Parts delivered before a composition failure stay
    /// valid.
    pub async fn run(
        &mut self,
        request: &PrintJobRequest,
        events: &mpsc::Sender<StatusEvent>,
    ) -> Result<JobSummary, JobError> {
        if let Err(e) = request.validate() {
            debug!(error = %e, "Rejected print request");
            PRINT_JOBS.with_label_values(&[e.result_label()]).inc();
            return Err(e);
        }

        let job_id = Uuid::new_v4();
        let total_units = request.total_units();
        info!(
            job_id = %job_id,
            cards = request.cards.len(),
            units = total_units,
            split = ?request.split,
            "Starting print job"
        );

        let result = self.execute(job_id, request, events).await;
        match &result {
            Ok(summary) => {
                self.phase = JobPhase::Done;
                PRINT_JOBS.with_label_values(&["success"]).inc();
                info!(job_id = %job_id, parts = summary.parts, "Print job complete");
            }
            Err(e) => {
                self.phase = JobPhase::Failed;
                PRINT_JOBS.with_label_values(&[e.result_label()]).inc();
                warn!(job_id = %job_id, error = %e, "Print job failed");
                let _ = events.send(StatusEvent::failed(format!("Error: {}", e))).await;
            }
        }
        result
    }

    async fn execute(
        &mut self,
        job_id: Uuid,
        request: &PrintJobRequest,
        events: &mpsc::Sender<StatusEvent>,
    ) -> Result<JobSummary, JobError> {
        self.phase = JobPhase::Fetching;
        let images = self.fetcher.fetch_all(&request.cards, Some(events)).await?;

        self.phase = JobPhase::Partitioning;
        let size = job_size(request.total_units(), self.page_capacity, request.split);
        let partitions = partition(&request.cards, size);
        debug!(
            job_id = %job_id,
            job_size = size,
            partitions = partitions.len(),
            "Partitioned card list"
        );

        for (index, part) in partitions.iter().enumerate() {
            self.phase = JobPhase::Composing(index);
            debug!(
                job_id = %job_id,
                part = index,
                runs = part.runs.len(),
                units = part.unit_count(),
                "Composing partition"
            );

            let started = Instant::now();
            let outcome = self.compose(part, &images, events).await;
            COMPOSE_DURATION
                .with_label_values(&[])
                .observe(started.elapsed().as_secs_f64());

            let pdf = match outcome {
                Ok(pdf) => {
                    PARTITIONS.with_label_values(&["success"]).inc();
                    pdf
                }
                Err(source) => {
                    PARTITIONS.with_label_values(&["failed"]).inc();
                    return Err(JobError::Composition {
                        part: index,
                        source,
                    });
                }
            };

            let part = request.split.map(|_| index);
            let _ = events.send(StatusEvent::Success { pdf, part }).await;
        }

        Ok(JobSummary {
            job_id,
            parts: partitions.len(),
            total_units: request.total_units(),
            images_fetched: images.len(),
        })
    }

    /// Build one partition on a blocking thread.
    ///
    /// The compositor is created, fed and disposed entirely inside the
    /// blocking task, so it is released even if the build panics.
    async fn compose(
        &self,
        part: &Partition,
        images: &[ImageBytes],
        events: &mpsc::Sender<StatusEvent>,
    ) -> Result<Vec<u8>, CompositionError> {
        let factory = Arc::clone(&self.factory);
        let runs: Vec<(u32, ImageBytes)> = part
            .runs
            .iter()
            .map(|run| (run.count, Arc::clone(&images[run.card_index])))
            .collect();
        let relay = events.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = CompositorGuard::acquire(factory.as_ref())?;
            guard.register_progress(Box::new(move |message: &str| {
                let _ = relay.blocking_send(StatusEvent::progress(message));
            }));
            for (count, image) in runs {
                guard.submit(count, image)?;
            }
            let pdf = guard.build();
            guard.release();
            pdf
        })
        .await
        .map_err(|e| CompositionError::Internal(format!("composition task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockCompositorFactory, MockImageSource};

    fn runner(factory: &Arc<MockCompositorFactory>) -> PrintJobRunner {
        PrintJobRunner::new(Arc::new(MockImageSource::new()), factory.clone())
    }

    fn collect(mut rx: mpsc::Receiver<StatusEvent>) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_phase_starts_idle() {
        let factory = Arc::new(MockCompositorFactory::new());
        assert_eq!(runner(&factory).phase(), JobPhase::Idle);
    }

    #[tokio::test]
    async fn test_invalid_request_emits_nothing() {
        let factory = Arc::new(MockCompositorFactory::new());
        let mut runner = runner(&factory);
        let (tx, rx) = mpsc::channel(16);

        let err = runner
            .run(&PrintJobRequest::new(vec![]), &tx)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::InvalidRequest(_)));
        assert!(!err.was_reported());
        assert_eq!(runner.phase(), JobPhase::Idle);
        drop(tx);
        assert!(collect(rx).is_empty());
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_split_run_ends_done() {
        let factory = Arc::new(MockCompositorFactory::new());
        let mut runner = runner(&factory);
        let (tx, rx) = mpsc::channel(64);

        let request = PrintJobRequest::new(fixtures::cards(&[10, 5])).with_split(1);
        let summary = runner.run(&request, &tx).await.unwrap();

        assert_eq!(summary.parts, 2);
        assert_eq!(summary.total_units, 15);
        assert_eq!(summary.images_fetched, 2);
        assert_eq!(runner.phase(), JobPhase::Done);

        drop(tx);
        let parts: Vec<Option<usize>> = collect(rx)
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::Success { part, .. } => Some(part),
                _ => None,
            })
            .collect();
        assert_eq!(parts, vec![Some(0), Some(1)]);
    }

    #[tokio::test]
    async fn test_page_capacity_changes_job_size() {
        let factory = Arc::new(MockCompositorFactory::new());
        let mut runner = runner(&factory).with_page_capacity(4);
        let (tx, _rx) = mpsc::channel(64);

        let request = PrintJobRequest::new(fixtures::cards(&[10])).with_split(1);
        let summary = runner.run(&request, &tx).await.unwrap();

        assert_eq!(summary.parts, 3);
        assert_eq!(factory.created(), 3);
    }

    #[tokio::test]
    async fn test_huge_split_produces_one_part() {
        let factory = Arc::new(MockCompositorFactory::new());
        let mut runner = runner(&factory);
        let (tx, rx) = mpsc::channel(64);

        let request = PrintJobRequest::new(fixtures::cards(&[10, 5])).with_split(usize::MAX);
        let summary = runner.run(&request, &tx).await.unwrap();

        assert_eq!(summary.parts, 1);
        assert_eq!(factory.created(), 1);
        assert_eq!(factory.instances()[0].unit_count(), 15);
        drop(tx);
        let parts: Vec<Option<usize>> = collect(rx)
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::Success { part, .. } => Some(part),
                _ => None,
            })
            .collect();
        assert_eq!(parts, vec![Some(0)]);
    }

    #[tokio::test]
    async fn test_composition_failure_sets_failed_phase() {
        let factory = Arc::new(MockCompositorFactory::new());
        factory.fail_build_of(0, "corrupt image");
        let mut runner = runner(&factory);
        let (tx, rx) = mpsc::channel(64);

        let err = runner
            .run(&PrintJobRequest::new(fixtures::cards(&[3])), &tx)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Composition { part: 0, .. }));
        assert_eq!(runner.phase(), JobPhase::Failed);
        drop(tx);
        let events = collect(rx);
        match events.last() {
            Some(StatusEvent::Failed { message }) => {
                assert!(message.starts_with("Error: "));
                assert!(message.contains("corrupt image"));
            }
            other => panic!("expected a failure event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_compositor_is_disposed() {
        let factory = Arc::new(MockCompositorFactory::new());
        factory.panic_on_build_of(0);
        let mut runner = runner(&factory);
        let (tx, _rx) = mpsc::channel(64);

        let err = runner
            .run(&PrintJobRequest::new(fixtures::cards(&[1])), &tx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JobError::Composition {
                source: CompositionError::Internal(_),
                ..
            }
        ));
        assert_eq!(factory.disposed(), 1);
    }

    #[tokio::test]
    async fn test_runner_is_reusable_after_failure() {
        let factory = Arc::new(MockCompositorFactory::new());
        factory.fail_build_of(0, "boom");
        let mut runner = runner(&factory);
        let (tx, _rx) = mpsc::channel(64);
        let request = PrintJobRequest::new(fixtures::cards(&[2]));

        assert!(runner.run(&request, &tx).await.is_err());
        assert!(runner.run(&request, &tx).await.is_ok());
        assert_eq!(runner.phase(), JobPhase::Done);
    }
}
