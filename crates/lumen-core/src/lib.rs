//! Core types for the Lumen lazy media engine.
//!
//! - [`MediaKind`] / [`ActivationState`] - what is deferred and how far it got
//! - [`MarkupContract`] - the attribute and class names templates use
//! - [`PageHost`] / [`MediaElement`] - the host seam backends implement

pub mod collections;
pub mod dom;
pub mod error;
pub mod kind;
pub mod markup;

pub use dom::*;
pub use error::*;
pub use kind::*;
pub use markup::*;
