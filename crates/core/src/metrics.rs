//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Print jobs (results, partitions, composition time)
//! - Image downloads (network vs cache, failures, cache size)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Print Jobs
// =============================================================================

/// Print jobs total by result.
pub static PRINT_JOBS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("proxysheet_print_jobs_total", "Total print jobs processed"),
        &["result"], // "success", "invalid", "fetch_failed", "compose_failed"
    )
    .unwrap()
});

/// Partitions composed by result.
pub static PARTITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("proxysheet_partitions_total", "Total partitions composed"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Time spent building one partition.
pub static COMPOSE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "proxysheet_compose_duration_seconds",
            "Duration of a single sheet composition",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Image Downloads
// =============================================================================

/// Images obtained, by where they came from.
pub static IMAGES_FETCHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("proxysheet_images_fetched_total", "Total card images obtained"),
        &["source"], // "network", "cache"
    )
    .unwrap()
});

/// Failed image downloads.
pub static IMAGE_FETCH_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "proxysheet_image_fetch_failures_total",
        "Total failed image downloads",
    )
    .unwrap()
});

/// Entries currently held by the image cache.
pub static IMAGE_CACHE_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "proxysheet_image_cache_entries",
        "Number of entries in the image cache",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Print jobs
        Box::new(PRINT_JOBS.clone()),
        Box::new(PARTITIONS.clone()),
        Box::new(COMPOSE_DURATION.clone()),
        // Image downloads
        Box::new(IMAGES_FETCHED.clone()),
        Box::new(IMAGE_FETCH_FAILURES.clone()),
        Box::new(IMAGE_CACHE_ENTRIES.clone()),
    ]
}
