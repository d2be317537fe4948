//! Lazy media engine for Lumen.
//!
//! Deferred images, SVG objects and videos keep their real URL in a marker
//! attribute until a [`VisibilityDetector`] reports them near the viewport;
//! a [`MediaActivator`] then promotes the URL and [`LoadedStateSync`] marks
//! the element once the host finishes loading it.

pub mod activator;
pub mod config;
pub mod controller;
pub mod deferred;
pub mod detector;
pub mod loaded;

pub use activator::*;
pub use config::*;
pub use controller::*;
pub use deferred::DeferredElement;
pub use detector::*;
pub use loaded::*;
