//! Print job lifecycle integration tests.
//!
//! These tests drive complete jobs through the runner:
//! fetching -> partitioning -> composing(i) -> done | failed

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use proxysheet_core::{
    testing::{fixtures, MockCompositorFactory, MockImageSource},
    CachedImageSource, CompositionError, FetchError, ImageCache, JobError, JobPhase,
    PrintJobRequest, PrintJobRunner, StatusEvent,
};

/// Test helper holding the mocks a runner was built from.
struct TestHarness {
    source: Arc<MockImageSource>,
    factory: Arc<MockCompositorFactory>,
    runner: PrintJobRunner,
}

impl TestHarness {
    fn new() -> Self {
        let source = Arc::new(MockImageSource::new());
        let factory = Arc::new(MockCompositorFactory::new());
        let runner = PrintJobRunner::new(source.clone(), factory.clone());
        Self {
            source,
            factory,
            runner,
        }
    }

    /// Runs `request` and returns its result with every event it produced.
    async fn run(
        &mut self,
        request: &PrintJobRequest,
    ) -> (Result<proxysheet_core::JobSummary, JobError>, Vec<StatusEvent>) {
        let (tx, mut rx) = mpsc::channel(256);
        let result = self.runner.run(request, &tx).await;
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }
}

fn successes(events: &[StatusEvent]) -> Vec<(Vec<u8>, Option<usize>)> {
    events
        .iter()
        .filter_map(|e| match e {
            StatusEvent::Success { pdf, part } => Some((pdf.clone(), *part)),
            _ => None,
        })
        .collect()
}

fn progress(events: &[StatusEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            StatusEvent::Progress { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

fn failures(events: &[StatusEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, StatusEvent::Failed { .. }))
        .count()
}

// =============================================================================
// Successful jobs
// =============================================================================

#[tokio::test]
async fn test_split_job_produces_one_file_per_partition() {
    let mut harness = TestHarness::new();
    let request = fixtures::request(&[10, 5], Some(1));

    let (result, events) = harness.run(&request).await;
    let summary = assert_ok!(result);
    assert_eq!(summary.parts, 2);

    let instances = harness.factory.instances();
    assert_eq!(instances.len(), 2);

    let image_a = MockImageSource::bytes_for(&fixtures::card_url(0));
    let image_b = MockImageSource::bytes_for(&fixtures::card_url(1));
    assert_eq!(instances[0].submissions, vec![(9, image_a.clone())]);
    assert_eq!(
        instances[1].submissions,
        vec![(1, image_a), (5, image_b)]
    );

    let delivered = successes(&events);
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].1, Some(0));
    assert_eq!(delivered[1].1, Some(1));
    assert_eq!(
        delivered[0].0,
        MockCompositorFactory::expected_pdf(0, &instances[0].submissions)
    );
    assert_eq!(
        delivered[1].0,
        MockCompositorFactory::expected_pdf(1, &instances[1].submissions)
    );
    assert_eq!(failures(&events), 0);
}

#[tokio::test]
async fn test_unsplit_job_produces_single_unnumbered_file() {
    let mut harness = TestHarness::new();
    let request = fixtures::request(&[9], None);

    let (result, events) = harness.run(&request).await;
    assert_ok!(result);

    let delivered = successes(&events);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].1, None);
    assert_eq!(harness.factory.instances()[0].unit_count(), 9);
    assert_eq!(harness.runner.phase(), JobPhase::Done);
}

#[tokio::test]
async fn test_event_order_for_a_job() {
    let mut harness = TestHarness::new();
    harness
        .factory
        .set_progress_messages(&["Generating page images (1 / 1)", "Compressing pages (1 / 1)"]);
    let request = fixtures::request(&[2, 3], None);

    let (result, events) = harness.run(&request).await;
    assert_ok!(result);

    assert_eq!(
        progress(&events),
        vec![
            "Downloading images (0 / 2)",
            "Downloading images (1 / 2)",
            "Downloading images (2 / 2)",
            "Generating page images (1 / 1)",
            "Compressing pages (1 / 1)",
        ]
    );
    assert!(matches!(events.last(), Some(StatusEvent::Success { .. })));
}

#[tokio::test]
async fn test_compositor_progress_precedes_its_success() {
    let mut harness = TestHarness::new();
    harness.factory.set_progress_messages(&["layout"]);
    let request = fixtures::request(&[18], Some(1));

    let (result, events) = harness.run(&request).await;
    assert_ok!(result);

    let tail: Vec<&StatusEvent> = events
        .iter()
        .skip_while(|e| !matches!(e, StatusEvent::Progress { message } if message == "layout"))
        .collect();
    assert!(matches!(tail[0], StatusEvent::Progress { .. }));
    assert!(matches!(tail[1], StatusEvent::Success { part: Some(0), .. }));
    assert!(matches!(tail[2], StatusEvent::Progress { .. }));
    assert!(matches!(tail[3], StatusEvent::Success { part: Some(1), .. }));
    assert_eq!(tail.len(), 4);
}

#[tokio::test]
async fn test_images_are_fetched_once_across_partitions() {
    let mut harness = TestHarness::new();
    let request = fixtures::request(&[20, 1], Some(1));

    let (result, _) = harness.run(&request).await;
    assert_ok!(result);

    assert_eq!(harness.factory.created(), 3);
    assert_eq!(harness.source.request_log().urls().len(), 2);
}

#[tokio::test]
async fn test_compositors_are_sequential_and_disposed_once() {
    let mut harness = TestHarness::new();
    let request = fixtures::request(&[7, 7, 7, 7], Some(1));

    let (result, _) = harness.run(&request).await;
    assert_ok!(result);

    assert_eq!(harness.factory.created(), 4);
    assert_eq!(harness.factory.disposed(), 4);
    assert_eq!(harness.factory.double_disposals(), 0);
    assert_eq!(harness.factory.max_live(), 1);
}

// =============================================================================
// Rejected and failed jobs
// =============================================================================

#[tokio::test]
async fn test_empty_request_does_no_work() {
    let mut harness = TestHarness::new();

    let (result, events) = harness.run(&fixtures::request(&[], None)).await;

    let err = assert_err!(result);
    assert!(matches!(err, JobError::InvalidRequest(_)));
    assert!(events.is_empty());
    assert!(harness.source.request_log().urls().is_empty());
    assert_eq!(harness.factory.created(), 0);
}

#[tokio::test]
async fn test_fetch_failure_emits_only_failed() {
    let mut harness = TestHarness::new();
    let bad = fixtures::card_url(1);
    harness.source.fail_url(
        &bad,
        FetchError::Status {
            url: bad.clone(),
            status: 404,
        },
    );

    let (result, events) = harness.run(&fixtures::request(&[3, 3, 3], Some(1))).await;

    assert!(matches!(assert_err!(result), JobError::Fetch(_)));
    assert!(successes(&events).is_empty());
    assert_eq!(failures(&events), 1);
    assert!(matches!(events.last(), Some(StatusEvent::Failed { message }) if message.contains("404")));
    assert_eq!(harness.factory.created(), 0);
    assert_eq!(harness.runner.phase(), JobPhase::Failed);
}

#[tokio::test]
async fn test_composition_failure_keeps_earlier_parts() {
    let mut harness = TestHarness::new();
    harness.factory.fail_build_of(1, "corrupt image bytes");

    let (result, events) = harness.run(&fixtures::request(&[9, 9, 9], Some(1))).await;

    let err = assert_err!(result);
    assert!(matches!(err, JobError::Composition { part: 1, .. }));

    let delivered = successes(&events);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].1, Some(0));
    assert_eq!(failures(&events), 1);
    assert!(matches!(events.last(), Some(StatusEvent::Failed { .. })));

    // The third partition is never started; both started compositors are released.
    assert_eq!(harness.factory.created(), 2);
    assert_eq!(harness.factory.disposed(), 2);
}

#[tokio::test]
async fn test_unavailable_compositor_fails_job() {
    let mut harness = TestHarness::new();
    harness.factory.fail_create(CompositionError::NotConfigured);

    let (result, events) = harness.run(&fixtures::request(&[1], None)).await;

    assert_err!(result);
    match events.last() {
        Some(StatusEvent::Failed { message }) => {
            assert!(message.contains("No sheet compositor is configured"))
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_job_finishes_after_caller_goes_away() {
    let mut harness = TestHarness::new();
    harness.factory.set_progress_messages(&["layout"]);
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let result = harness
        .runner
        .run(&fixtures::request(&[10, 5], Some(1)), &tx)
        .await;

    assert_ok!(result);
    assert_eq!(harness.factory.disposed(), 2);
}

// =============================================================================
// Cached sources
// =============================================================================

#[tokio::test]
async fn test_cached_source_serves_repeat_jobs() {
    let inner = MockImageSource::new();
    let log = inner.request_log();
    let source = Arc::new(CachedImageSource::new(
        inner,
        ImageCache::new(Duration::from_secs(60)),
    ));
    let factory = Arc::new(MockCompositorFactory::new());
    let mut runner = PrintJobRunner::new(source, factory.clone());
    let (tx, _rx) = mpsc::channel(256);

    let request = fixtures::request(&[1, 1], None);
    assert_ok!(runner.run(&request, &tx).await);
    assert_ok!(runner.run(&request, &tx).await);

    assert_eq!(log.urls().len(), 2);
    assert_eq!(factory.created(), 2);
}
