//! Trait definitions for the compositor module.

use crate::fetcher::ImageBytes;

use super::error::CompositionError;

/// Receives progress messages emitted by a compositor while it builds.
pub type ProgressCallback = Box<dyn FnMut(&str) + Send>;

/// One build of printable sheets.
///
/// Instances are single use: submit runs, build once, then dispose. Callers
/// normally hold instances through a [`CompositorGuard`](super::CompositorGuard).
pub trait SheetCompositor: Send {
    /// Returns the name of this compositor implementation.
    fn name(&self) -> &str;

    /// Appends `count` copies of a card image, in call order.
    fn submit(&mut self, count: u32, image: ImageBytes) -> Result<(), CompositionError>;

    /// Sets the callback that receives progress messages during `build`.
    fn register_progress(&mut self, callback: ProgressCallback);

    /// Lays out every submitted card and returns the PDF bytes.
    ///
    /// Blocks until the document is complete.
    fn build(&mut self) -> Result<Vec<u8>, CompositionError>;

    /// Releases everything the instance holds. Never fails.
    fn dispose(&mut self);
}

/// Creates fresh compositor instances.
pub trait CompositorFactory: Send + Sync {
    /// Returns the name of the compositors this factory creates.
    fn name(&self) -> &str;

    /// Creates a new, empty compositor.
    fn create(&self) -> Result<Box<dyn SheetCompositor>, CompositionError>;
}
