//! Visibility detection for one media kind.
//!
//! A [`VisibilityDetector`] keeps a watch-list of elements and signals each
//! one once per watch, when it first intersects (or, when polling, approaches)
//! the viewport. Signalled elements leave the watch-list before the signal
//! runs, so re-entrant calls from the signal see a consistent detector. The
//! detector keeps no record of them afterwards.
//!
//! Two strategies exist:
//! - [`DetectionStrategy::Observer`] delegates to the host's native
//!   intersection observer.
//! - [`DetectionStrategy::Polling`] re-evaluates element offsets after the
//!   viewport settles, debouncing scroll/resize/orientation events. Listeners
//!   exist only while the watch-list is non-empty.

mod observer;
mod polling;

pub use polling::is_approaching;

use std::cell::RefCell;
use std::rc::Rc;

use lumen_core::{IntersectionObserverHandle, MediaKind, PageHost};

use crate::config::DetectorOptions;

/// How a detector learns about visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionStrategy {
    Observer,
    Polling,
}

/// Called once per element when it becomes visible.
pub type VisibilitySignal<E> = Rc<dyn Fn(&E)>;

/// Watches elements of one kind and signals each once per watch.
pub struct VisibilityDetector<H: PageHost> {
    inner: Rc<RefCell<DetectorInner<H>>>,
}

impl<H: PageHost> Clone for VisibilityDetector<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub(crate) struct DetectorInner<H: PageHost> {
    host: Rc<H>,
    kind: MediaKind,
    watched: Vec<H::Element>,
    signal: VisibilitySignal<H::Element>,
    backend: Backend<H::Element>,
    started: bool,
}

enum Backend<E> {
    Observer(Rc<dyn IntersectionObserverHandle<E>>),
    Polling(polling::PollingState),
}

impl<H: PageHost> Drop for DetectorInner<H> {
    fn drop(&mut self) {
        if let Backend::Observer(handle) = &self.backend {
            handle.disconnect();
        }
    }
}

impl<H: PageHost> VisibilityDetector<H> {
    /// Creates a detector, choosing the observer strategy when the host
    /// supports it and `force_polling` is off.
    pub fn new(
        host: Rc<H>,
        kind: MediaKind,
        options: &DetectorOptions,
        force_polling: bool,
        signal: impl Fn(&H::Element) + 'static,
    ) -> Self {
        let signal: VisibilitySignal<H::Element> = Rc::new(signal);
        let inner = Rc::new_cyclic(|weak| {
            let use_observer = !force_polling && host.supports_intersection_observer();
            let backend = if use_observer {
                match observer::connect(&*host, &options.observer, weak.clone()) {
                    Ok(handle) => Backend::Observer(handle),
                    Err(err) => {
                        log::warn!("{kind} detector falling back to polling: {err}");
                        Backend::Polling(polling::PollingState::new(options.debounce_ms))
                    }
                }
            } else {
                Backend::Polling(polling::PollingState::new(options.debounce_ms))
            };
            RefCell::new(DetectorInner {
                host: host.clone(),
                kind,
                watched: Vec::new(),
                signal,
                backend,
                started: false,
            })
        });
        Self { inner }
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.borrow().kind
    }

    pub fn strategy(&self) -> DetectionStrategy {
        match self.inner.borrow().backend {
            Backend::Observer(_) => DetectionStrategy::Observer,
            Backend::Polling(_) => DetectionStrategy::Polling,
        }
    }

    /// Adds `element` to the watch-list.
    ///
    /// Returns `false` for an element that is already watched. A signalled
    /// element has left the watch-list, so watching it again arms a new
    /// signal. Elements added after [`start`](Self::start) are picked up
    /// without another call to it.
    pub fn watch(&self, element: H::Element) -> bool {
        let (handle, started) = {
            let mut inner = self.inner.borrow_mut();
            if inner.watched.contains(&element) {
                return false;
            }
            inner.watched.push(element.clone());
            let handle = match &inner.backend {
                Backend::Observer(handle) => Some(handle.clone()),
                Backend::Polling(_) => None,
            };
            (handle, inner.started)
        };
        match handle {
            Some(handle) => handle.observe(&element),
            None if started => polling::resume(&self.inner),
            None => {}
        }
        true
    }

    /// Begins detection. Idempotent.
    ///
    /// The polling strategy evaluates the watch-list once synchronously so
    /// elements already on screen are signalled without waiting for an event.
    pub fn start(&self) {
        let polling = {
            let mut inner = self.inner.borrow_mut();
            if inner.started {
                return;
            }
            inner.started = true;
            matches!(inner.backend, Backend::Polling(_))
        };
        if polling {
            polling::evaluate(&self.inner);
            polling::listen(&self.inner);
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.borrow().started
    }

    pub fn watched_len(&self) -> usize {
        self.inner.borrow().watched.len()
    }

    pub fn is_watching(&self, element: &H::Element) -> bool {
        self.inner.borrow().watched.contains(element)
    }

    /// Whether polling currently holds viewport listeners.
    pub fn is_listening(&self) -> bool {
        match &self.inner.borrow().backend {
            Backend::Polling(state) => state.is_listening(),
            Backend::Observer(_) => false,
        }
    }
}
