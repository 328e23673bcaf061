//! Scoped ownership of a compositor instance.

use tracing::debug;

use crate::fetcher::ImageBytes;

use super::{CompositionError, CompositorFactory, ProgressCallback, SheetCompositor};

/// Owns one compositor and disposes it exactly once.
///
/// Disposal happens on `release` or when the guard is dropped, including
/// during unwinding.
pub struct CompositorGuard {
    compositor: Box<dyn SheetCompositor>,
    disposed: bool,
}

impl CompositorGuard {
    /// Creates a compositor from `factory` and takes ownership of it.
    pub fn acquire(factory: &dyn CompositorFactory) -> Result<Self, CompositionError> {
        let compositor = factory.create()?;
        debug!(compositor = compositor.name(), "Acquired compositor");
        Ok(Self::new(compositor))
    }

    /// Wraps an existing compositor.
    pub fn new(compositor: Box<dyn SheetCompositor>) -> Self {
        Self {
            compositor,
            disposed: false,
        }
    }

    pub fn submit(&mut self, count: u32, image: ImageBytes) -> Result<(), CompositionError> {
        self.compositor.submit(count, image)
    }

    pub fn register_progress(&mut self, callback: ProgressCallback) {
        self.compositor.register_progress(callback);
    }

    pub fn build(&mut self) -> Result<Vec<u8>, CompositionError> {
        self.compositor.build()
    }

    /// Disposes the compositor now.
    pub fn release(mut self) {
        self.dispose();
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.compositor.dispose();
            debug!(compositor = self.compositor.name(), "Disposed compositor");
        }
    }
}

impl Drop for CompositorGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}
