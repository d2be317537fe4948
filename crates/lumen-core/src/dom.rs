//! Host seam: the slice of the page the engine needs.
//!
//! The browser backend implements these traits over `web-sys`; the testing
//! crate implements them over an in-memory tree with a virtual clock. The
//! engine itself never touches a concrete DOM.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::error::LazyLoadError;

/// Keeps a host registration (listener, timer, observer) alive.
///
/// Dropping the subscription detaches the registration. Replacing a stored
/// timer subscription therefore cancels the previous timer.
#[must_use = "dropping a Subscription detaches it immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl Subscription {
    /// Wraps a host guard whose own `Drop` detaches the registration.
    pub fn new(guard: impl Any) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }

    /// Runs `detach` when the subscription is dropped.
    pub fn on_drop(detach: impl FnOnce() + 'static) -> Self {
        Self::new(OnDrop(Some(Box::new(detach))))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription(..)")
    }
}

struct OnDrop(Option<Box<dyn FnOnce()>>);

impl Drop for OnDrop {
    fn drop(&mut self) {
        if let Some(detach) = self.0.take() {
            detach();
        }
    }
}

/// Page-level events that can bring new content into view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewportEvent {
    /// Dispatched on the document.
    Scroll,
    /// Dispatched on the window.
    Resize,
    /// Dispatched on the window.
    OrientationChange,
}

impl ViewportEvent {
    pub const ALL: [ViewportEvent; 3] = [
        ViewportEvent::Scroll,
        ViewportEvent::Resize,
        ViewportEvent::OrientationChange,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            ViewportEvent::Scroll => "scroll",
            ViewportEvent::Resize => "resize",
            ViewportEvent::OrientationChange => "orientationchange",
        }
    }
}

/// Options forwarded to the host's intersection observer.
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverOptions {
    /// CSS margin around the root, e.g. `"50px 0px"`.
    pub root_margin: String,
    /// Fraction of the target that must be visible, in `0.0..=1.0`.
    pub threshold: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: "0px".into(),
            threshold: 0.0,
        }
    }
}

/// One target whose intersection state changed.
#[derive(Clone, Debug)]
pub struct IntersectionEntry<E> {
    pub target: E,
    pub is_intersecting: bool,
}

/// Callback receiving the batch of changed targets.
pub type IntersectionCallback<E> = Rc<dyn Fn(Vec<IntersectionEntry<E>>)>;

/// A live native intersection observer.
///
/// Hosts report targets that are already intersecting on first observation.
pub trait IntersectionObserverHandle<E> {
    fn observe(&self, target: &E);
    fn unobserve(&self, target: &E);
    fn disconnect(&self);
}

/// Element operations the engine performs.
///
/// Handles are cheap clones referring to a node the page owns; equality is
/// node identity.
pub trait MediaElement: Clone + PartialEq + fmt::Debug + 'static {
    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;
    fn set_attribute(&self, name: &str, value: &str);
    fn remove_attribute(&self, name: &str);

    fn has_class(&self, class: &str) -> bool;
    fn add_class(&self, class: &str);

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, selector: &str) -> Option<Self>;
    /// First descendant matching `selector`.
    fn query_descendant(&self, selector: &str) -> Option<Self>;

    /// Appends a `<source>` child with the given URL and MIME type.
    fn append_source(&self, src: &str, mime: &str);
    /// Asks a media element to re-select its source and start loading.
    fn reload(&self);

    /// Offset from the top edge of the element's offset parent, in CSS
    /// pixels (`HTMLElement.offsetTop`).
    fn offset_top(&self) -> f64;
    /// Whether the element's resource has already finished loading.
    fn is_complete(&self) -> bool;

    /// Registers `callback` for the next `event` on this element.
    ///
    /// The host keeps the listener alive until it fires. An `error` on the
    /// element releases it without running `callback`.
    fn once(&self, event: &str, callback: Box<dyn FnOnce()>);
}

/// Page operations the engine performs.
pub trait PageHost: 'static {
    type Element: MediaElement;

    /// Elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<Self::Element>;

    /// Current vertical scroll offset.
    fn scroll_offset(&self) -> f64;
    /// Height of the layout viewport.
    fn viewport_height(&self) -> f64;

    /// Whether the host offers native intersection observation.
    fn supports_intersection_observer(&self) -> bool;

    fn observe_intersections(
        &self,
        options: &ObserverOptions,
        callback: IntersectionCallback<Self::Element>,
    ) -> Result<Rc<dyn IntersectionObserverHandle<Self::Element>>, LazyLoadError>;

    fn listen_viewport(&self, event: ViewportEvent, callback: Rc<dyn Fn()>) -> Subscription;

    /// Listens for a named event on the window.
    fn listen_window(&self, event: &str, callback: Rc<dyn Fn()>) -> Subscription;

    /// Runs `callback` once after `delay_ms`, unless the subscription is dropped first.
    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscription_detaches_on_drop() {
        let detached = Rc::new(Cell::new(false));
        let flag = detached.clone();
        let subscription = Subscription::on_drop(move || flag.set(true));
        assert!(!detached.get());
        drop(subscription);
        assert!(detached.get());
    }

    #[test]
    fn replacing_a_slot_drops_the_previous_subscription() {
        let drops = Rc::new(Cell::new(0));
        let mut slot: Option<Subscription> = None;
        for _ in 0..3 {
            let counter = drops.clone();
            slot = Some(Subscription::on_drop(move || counter.set(counter.get() + 1)));
        }
        assert_eq!(drops.get(), 2);
        slot.take();
        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn viewport_event_names() {
        let names: Vec<_> = ViewportEvent::ALL.iter().map(|e| e.event_name()).collect();
        assert_eq!(names, ["scroll", "resize", "orientationchange"]);
    }
}
