//! Compositor module for turning card images into printable PDF sheets.
//!
//! The page layout itself is done by an external sheet compositor. This module
//! defines the contract the print pipeline drives it through, a guard that
//! guarantees every instance is disposed, and an adapter for compositors that
//! run as a separate executable.
//!
//! # Example
//!
//! ```ignore
//! use proxysheet_core::compositor::{CommandCompositorFactory, CompositorGuard};
//!
//! let factory = CommandCompositorFactory::new(config.compositor.clone());
//! let mut guard = CompositorGuard::acquire(&factory)?;
//! guard.register_progress(Box::new(|msg| println!("{}", msg)));
//! guard.submit(4, image_bytes)?;
//! let pdf = guard.build()?;
//! // Dropping the guard disposes the compositor.
//! ```

mod command;
mod error;
mod guard;
mod traits;

pub use command::{CommandCompositor, CommandCompositorFactory};
pub use error::CompositionError;
pub use guard::CompositorGuard;
pub use traits::{CompositorFactory, ProgressCallback, SheetCompositor};
