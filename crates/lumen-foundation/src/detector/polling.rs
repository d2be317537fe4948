//! Offset-based fallback for hosts without native intersection observation.

use std::cell::RefCell;
use std::rc::Rc;

use lumen_core::{MediaElement, PageHost, Subscription, ViewportEvent};

use super::{Backend, DetectorInner};

/// Whether an element whose top edge sits at `offset_top` has reached the
/// bottom of the viewport.
///
/// Elements above the viewport also qualify: a page opened scrolled down
/// activates everything it has already passed.
pub fn is_approaching(offset_top: f64, scroll_offset: f64, viewport_height: f64) -> bool {
    offset_top < scroll_offset + viewport_height
}

pub(super) struct PollingState {
    debounce_ms: u32,
    listeners: Vec<Subscription>,
    timer: Option<Subscription>,
}

impl PollingState {
    pub(super) fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            listeners: Vec::new(),
            timer: None,
        }
    }

    pub(super) fn is_listening(&self) -> bool {
        !self.listeners.is_empty()
    }

    fn retire(&mut self) {
        self.listeners.clear();
        self.timer = None;
    }
}

/// Signals every watched element that is approaching the viewport.
pub(super) fn evaluate<H: PageHost>(inner: &Rc<RefCell<DetectorInner<H>>>) {
    let (approaching, signal) = {
        let mut guard = inner.borrow_mut();
        let state = &mut *guard;
        let scroll_offset = state.host.scroll_offset();
        let viewport_height = state.host.viewport_height();

        let (approaching, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut state.watched)
            .into_iter()
            .partition(|element| {
                is_approaching(element.offset_top(), scroll_offset, viewport_height)
            });
        state.watched = remaining;

        if let Backend::Polling(polling) = &mut state.backend {
            polling.timer = None;
            if state.watched.is_empty() && polling.is_listening() {
                log::debug!("{} polling retired, watch-list empty", state.kind);
                polling.retire();
            }
        }
        (approaching, state.signal.clone())
    };

    for element in &approaching {
        signal(element);
    }
}

/// Attaches viewport listeners unless already attached or nothing is watched.
pub(super) fn listen<H: PageHost>(inner: &Rc<RefCell<DetectorInner<H>>>) {
    let host = {
        let state = inner.borrow();
        match &state.backend {
            Backend::Polling(polling) if !polling.is_listening() && !state.watched.is_empty() => {
                state.host.clone()
            }
            _ => return,
        }
    };

    let detector = Rc::downgrade(inner);
    let on_viewport_change: Rc<dyn Fn()> = Rc::new(move || {
        if let Some(inner) = detector.upgrade() {
            schedule(&inner);
        }
    });
    let listeners: Vec<Subscription> = ViewportEvent::ALL
        .iter()
        .map(|event| host.listen_viewport(*event, on_viewport_change.clone()))
        .collect();

    if let Backend::Polling(polling) = &mut inner.borrow_mut().backend {
        polling.listeners = listeners;
    }
}

/// (Re)arms the debounce timer. Replacing the stored subscription cancels
/// the previous timer.
pub(super) fn schedule<H: PageHost>(inner: &Rc<RefCell<DetectorInner<H>>>) {
    let (host, delay) = {
        let state = inner.borrow();
        match &state.backend {
            Backend::Polling(polling) => (state.host.clone(), polling.debounce_ms),
            Backend::Observer(_) => return,
        }
    };

    let detector = Rc::downgrade(inner);
    let timer = host.set_timeout(
        delay,
        Box::new(move || {
            if let Some(inner) = detector.upgrade() {
                evaluate(&inner);
            }
        }),
    );

    let previous = match &mut inner.borrow_mut().backend {
        Backend::Polling(polling) => polling.timer.replace(timer),
        Backend::Observer(_) => None,
    };
    drop(previous);
}

/// Picks up elements watched after the detector started.
pub(super) fn resume<H: PageHost>(inner: &Rc<RefCell<DetectorInner<H>>>) {
    listen(inner);
    schedule(inner);
}
