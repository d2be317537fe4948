use std::cell::RefCell;
use std::rc::{Rc, Weak};

use lumen_core::{
    IntersectionEntry, IntersectionObserverHandle, LazyLoadError, ObserverOptions, PageHost,
};
use smallvec::SmallVec;

use super::{Backend, DetectorInner};

pub(super) fn connect<H: PageHost>(
    host: &H,
    options: &ObserverOptions,
    detector: Weak<RefCell<DetectorInner<H>>>,
) -> Result<Rc<dyn IntersectionObserverHandle<H::Element>>, LazyLoadError> {
    host.observe_intersections(
        options,
        Rc::new(move |entries: Vec<IntersectionEntry<H::Element>>| {
            if let Some(inner) = detector.upgrade() {
                deliver(&inner, entries);
            }
        }),
    )
}

/// Takes intersecting targets off the watch-list, then stops observing and
/// signals them with the detector released.
fn deliver<H: PageHost>(
    inner: &Rc<RefCell<DetectorInner<H>>>,
    entries: Vec<IntersectionEntry<H::Element>>,
) {
    let (visible, handle, signal) = {
        let mut guard = inner.borrow_mut();
        let state = &mut *guard;
        let mut visible: SmallVec<[H::Element; 4]> = SmallVec::new();
        for entry in entries.into_iter().filter(|entry| entry.is_intersecting) {
            if let Some(index) = state.watched.iter().position(|e| *e == entry.target) {
                let element = state.watched.remove(index);
                visible.push(element);
            }
        }
        let handle = match &state.backend {
            Backend::Observer(handle) => Some(handle.clone()),
            Backend::Polling(_) => None,
        };
        (visible, handle, state.signal.clone())
    };

    for element in &visible {
        if let Some(handle) = &handle {
            handle.unobserve(element);
        }
        signal(element);
    }
}
