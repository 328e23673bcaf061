//! Mock sheet compositor for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::compositor::{CompositionError, CompositorFactory, ProgressCallback, SheetCompositor};
use crate::fetcher::ImageBytes;

/// What happened to one compositor instance.
#[derive(Debug, Clone, Default)]
pub struct RecordedCompositor {
    /// `(count, image)` pairs in submission order.
    pub submissions: Vec<(u32, ImageBytes)>,
    /// Whether `build` was called.
    pub built: bool,
    /// How many times `dispose` was called.
    pub dispose_calls: usize,
}

impl RecordedCompositor {
    /// Total card units submitted.
    pub fn unit_count(&self) -> usize {
        self.submissions.iter().map(|(c, _)| *c as usize).sum()
    }
}

#[derive(Debug, Default)]
struct FactoryState {
    instances: Vec<RecordedCompositor>,
    build_failures: HashMap<usize, String>,
    build_panics: Vec<usize>,
    create_error: Option<CompositionError>,
    progress_messages: Vec<String>,
    live: usize,
    max_live: usize,
}

type SharedState = Arc<Mutex<FactoryState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, FactoryState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock implementation of the CompositorFactory trait.
///
/// Instances are numbered in creation order starting at 0. Provides
/// controllable behavior for testing:
/// - Record submissions and dispose calls per instance
/// - Fail or panic the build of a given instance
/// - Emit progress messages during every build
///
/// A successful build returns [`MockCompositorFactory::expected_pdf`] for the
/// instance's submissions.
///
/// # Example
///
/// ```rust,ignore
/// use proxysheet_core::testing::MockCompositorFactory;
///
/// let factory = Arc::new(MockCompositorFactory::new());
/// factory.fail_build_of(1, "corrupt image");
///
/// // ... run a job ...
/// assert_eq!(factory.created(), 2);
/// assert_eq!(factory.disposed(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockCompositorFactory {
    state: SharedState,
}

impl MockCompositorFactory {
    /// Create a new mock factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the build of instance `index` fail with `message`.
    pub fn fail_build_of(&self, index: usize, message: &str) {
        lock(&self.state)
            .build_failures
            .insert(index, message.to_string());
    }

    /// Make the build of instance `index` panic.
    pub fn panic_on_build_of(&self, index: usize) {
        lock(&self.state).build_panics.push(index);
    }

    /// Make every subsequent `create` fail with `error`.
    pub fn fail_create(&self, error: CompositionError) {
        lock(&self.state).create_error = Some(error);
    }

    /// Messages every build reports through its progress callback.
    pub fn set_progress_messages(&self, messages: &[&str]) {
        lock(&self.state).progress_messages = messages.iter().map(|m| m.to_string()).collect();
    }

    /// Number of instances created.
    pub fn created(&self) -> usize {
        lock(&self.state).instances.len()
    }

    /// Number of instances disposed at least once.
    pub fn disposed(&self) -> usize {
        lock(&self.state)
            .instances
            .iter()
            .filter(|i| i.dispose_calls > 0)
            .count()
    }

    /// Number of extra `dispose` calls beyond the first, across all instances.
    pub fn double_disposals(&self) -> usize {
        lock(&self.state)
            .instances
            .iter()
            .map(|i| i.dispose_calls.saturating_sub(1))
            .sum()
    }

    /// Highest number of instances alive at the same time.
    pub fn max_live(&self) -> usize {
        lock(&self.state).max_live
    }

    /// Record of every instance, in creation order.
    pub fn instances(&self) -> Vec<RecordedCompositor> {
        lock(&self.state).instances.clone()
    }

    /// The document a successful build produces for `submissions`.
    pub fn expected_pdf(index: usize, submissions: &[(u32, ImageBytes)]) -> Vec<u8> {
        let mut pdf = format!("%PDF-mock instance={}\n", index).into_bytes();
        for (count, image) in submissions {
            pdf.extend_from_slice(format!("{} x ", count).as_bytes());
            pdf.extend_from_slice(image);
            pdf.push(b'\n');
        }
        pdf
    }
}

impl CompositorFactory for MockCompositorFactory {
    fn name(&self) -> &str {
        "mock"
    }

    fn create(&self) -> Result<Box<dyn SheetCompositor>, CompositionError> {
        let mut state = lock(&self.state);
        if let Some(error) = &state.create_error {
            return Err(error.clone());
        }
        let index = state.instances.len();
        state.instances.push(RecordedCompositor::default());
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        drop(state);

        Ok(Box::new(MockCompositor {
            index,
            state: Arc::clone(&self.state),
            progress: None,
        }))
    }
}

struct MockCompositor {
    index: usize,
    state: SharedState,
    progress: Option<ProgressCallback>,
}

impl SheetCompositor for MockCompositor {
    fn name(&self) -> &str {
        "mock"
    }

    fn submit(&mut self, count: u32, image: ImageBytes) -> Result<(), CompositionError> {
        lock(&self.state).instances[self.index]
            .submissions
            .push((count, image));
        Ok(())
    }

    fn register_progress(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    fn build(&mut self) -> Result<Vec<u8>, CompositionError> {
        let (messages, failure, panics, submissions) = {
            let mut state = lock(&self.state);
            state.instances[self.index].built = true;
            (
                state.progress_messages.clone(),
                state.build_failures.get(&self.index).cloned(),
                state.build_panics.contains(&self.index),
                state.instances[self.index].submissions.clone(),
            )
        };

        if let Some(callback) = self.progress.as_mut() {
            for message in &messages {
                callback(message);
            }
        }
        if panics {
            panic!("mock compositor {} panicked during build", self.index);
        }
        if let Some(reason) = failure {
            return Err(CompositionError::build_failed(reason, None));
        }

        Ok(MockCompositorFactory::expected_pdf(self.index, &submissions))
    }

    fn dispose(&mut self) {
        self.progress = None;
        let mut state = lock(&self.state);
        let first = state.instances[self.index].dispose_calls == 0;
        state.instances[self.index].dispose_calls += 1;
        if first {
            state.live = state.live.saturating_sub(1);
        }
    }
}
