//! Print job orchestration.
//!
//! A [`PrintJobRunner`] turns one [`PrintJobRequest`] into PDF files:
//! - **Fetching**: every card image is downloaded once, in bounded batches
//! - **Partitioning**: card units are grouped into files of `page_capacity * split` units
//! - **Composing**: each partition is built by a fresh compositor, strictly in order
//!
//! Progress and results are sent as [`StatusEvent`]s over an mpsc channel.

mod error;
mod runner;
mod types;

pub use error::JobError;
pub use runner::{PrintJobRunner, DEFAULT_PAGE_CAPACITY};
pub use types::{CardRequest, JobPhase, JobSummary, PrintJobRequest, StatusEvent};
