//! Promotes a deferred element's source to its live source.
//!
//! Activation is the only place the engine writes media URLs. Each kind has
//! its own rule; all of them are no-ops on elements that are not pending, so
//! a duplicate visibility signal can never fetch a resource twice.

use std::fmt;

use lumen_core::{MarkupContract, MediaElement, MediaKind};

use crate::deferred::pending_source;

/// Result of one activation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    Activated,
    Skipped(SkipReason),
}

impl Activation {
    pub fn is_activated(self) -> bool {
        matches!(self, Activation::Activated)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The element carries no (or an empty) deferred source.
    NoPendingSource,
    /// A video already has a `<source>` child.
    SourceAlreadyAttached,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPendingSource => f.write_str("no pending source"),
            SkipReason::SourceAlreadyAttached => f.write_str("source already attached"),
        }
    }
}

/// Kind-specific activation rule.
pub trait MediaActivator<E: MediaElement> {
    fn kind(&self) -> MediaKind;

    fn activate(&self, element: &E) -> Activation;
}

/// Copies `data-src` into `src` and drops the marker.
#[derive(Clone, Debug)]
pub struct ImageActivator {
    marker: String,
}

impl ImageActivator {
    pub fn new(markup: &MarkupContract) -> Self {
        Self {
            marker: markup.marker(MediaKind::Image).to_string(),
        }
    }
}

impl<E: MediaElement> MediaActivator<E> for ImageActivator {
    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn activate(&self, element: &E) -> Activation {
        let Some(source) = pending_source(element, &self.marker) else {
            return Activation::Skipped(SkipReason::NoPendingSource);
        };
        element.set_attribute("src", &source);
        element.remove_attribute(&self.marker);
        Activation::Activated
    }
}

/// Copies the deferred URL into an `<object>`'s `data` attribute.
#[derive(Clone, Debug)]
pub struct VectorObjectActivator {
    marker: String,
}

impl VectorObjectActivator {
    pub fn new(markup: &MarkupContract) -> Self {
        Self {
            marker: markup.marker(MediaKind::VectorObject).to_string(),
        }
    }
}

impl<E: MediaElement> MediaActivator<E> for VectorObjectActivator {
    fn kind(&self) -> MediaKind {
        MediaKind::VectorObject
    }

    fn activate(&self, element: &E) -> Activation {
        let Some(source) = pending_source(element, &self.marker) else {
            return Activation::Skipped(SkipReason::NoPendingSource);
        };
        element.set_attribute("data", &source);
        element.remove_attribute(&self.marker);
        Activation::Activated
    }
}

/// Appends a typed `<source>` child and asks the video to reload.
#[derive(Clone, Debug)]
pub struct VideoActivator {
    marker: String,
    mime: String,
}

impl VideoActivator {
    pub fn new(markup: &MarkupContract) -> Self {
        Self {
            marker: markup.marker(MediaKind::Video).to_string(),
            mime: markup.video_mime.clone(),
        }
    }
}

impl<E: MediaElement> MediaActivator<E> for VideoActivator {
    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn activate(&self, element: &E) -> Activation {
        if element.query_descendant("source").is_some() {
            return Activation::Skipped(SkipReason::SourceAlreadyAttached);
        }
        let Some(source) = pending_source(element, &self.marker) else {
            return Activation::Skipped(SkipReason::NoPendingSource);
        };
        element.append_source(&source, &self.mime);
        element.remove_attribute(&self.marker);
        element.reload();
        Activation::Activated
    }
}

/// Activator for `kind` using the names in `markup`.
pub fn activator_for<E: MediaElement>(
    kind: MediaKind,
    markup: &MarkupContract,
) -> Box<dyn MediaActivator<E>> {
    match kind {
        MediaKind::Image => Box::new(ImageActivator::new(markup)),
        MediaKind::VectorObject => Box::new(VectorObjectActivator::new(markup)),
        MediaKind::Video => Box::new(VideoActivator::new(markup)),
    }
}
