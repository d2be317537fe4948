//! Media kinds and their activation lifecycle.

use std::fmt;

/// The three kinds of deferred media the engine knows how to activate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaKind {
    /// `<img>` whose real URL waits in a marker attribute.
    Image,
    /// `<object>` embedding an SVG document through its `data` reference.
    VectorObject,
    /// `<video>` that receives a `<source>` child on activation.
    Video,
}

impl MediaKind {
    /// All kinds in the order the controller discovers them.
    pub const ALL: [MediaKind; 3] = [MediaKind::VectorObject, MediaKind::Image, MediaKind::Video];

    /// Element tag the kind is discovered on.
    pub fn tag_name(self) -> &'static str {
        match self {
            MediaKind::Image => "img",
            MediaKind::VectorObject => "object",
            MediaKind::Video => "video",
        }
    }

    /// Event the host fires once the kind's resource is usable.
    pub fn completion_event(self) -> &'static str {
        match self {
            MediaKind::Image | MediaKind::VectorObject => "load",
            MediaKind::Video => "loadeddata",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Image => "image",
            MediaKind::VectorObject => "vector-object",
            MediaKind::Video => "video",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a single deferred element.
///
/// The ordering is meaningful: states only ever move to a greater value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivationState {
    /// Real source still withheld in the marker attribute.
    Pending,
    /// Source applied, waiting for the host to report completion.
    Activating,
    /// Terminal: the loaded class has been applied.
    Loaded,
}

impl ActivationState {
    /// Whether moving from `self` to `next` respects forward-only progression.
    pub fn can_advance_to(self, next: ActivationState) -> bool {
        next >= self
    }

    pub fn is_terminal(self) -> bool {
        self == ActivationState::Loaded
    }
}
