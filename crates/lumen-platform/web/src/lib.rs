//! Browser implementation of the Lumen host seam over `web-sys`.

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use js_sys::{Array, Reflect};
use lumen_core::{
    IntersectionCallback, IntersectionEntry, IntersectionObserverHandle, LazyLoadError,
    MediaElement, ObserverOptions, PageHost, Subscription, ViewportEvent,
};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, EventTarget, HtmlElement, HtmlImageElement, HtmlMediaElement,
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit, Window,
};

/// `HTMLMediaElement.HAVE_CURRENT_DATA`
const HAVE_CURRENT_DATA: u16 = 2;

fn host_error(call: &'static str, err: JsValue) -> LazyLoadError {
    LazyLoadError::host(call, format!("{err:?}"))
}

fn warn_on_err(call: &'static str, result: Result<(), JsValue>) {
    if let Err(err) = result {
        log::warn!("{}", host_error(call, err));
    }
}

/// The current document.
pub struct WebPage {
    window: Window,
    document: Document,
}

impl WebPage {
    pub fn new() -> Result<Self, LazyLoadError> {
        let window = web_sys::window().ok_or(LazyLoadError::NoWindow)?;
        let document = window.document().ok_or(LazyLoadError::NoDocument)?;
        Ok(Self { window, document })
    }

    /// Whether the parser is still building the document.
    pub fn is_loading(&self) -> bool {
        self.document.ready_state() == "loading"
    }

    /// Runs `f` once the document structure is parsed: immediately when it
    /// already is, otherwise on `DOMContentLoaded`.
    pub fn on_ready(&self, f: impl FnOnce() + 'static) {
        if self.is_loading() {
            EventListener::once(&self.document, "DOMContentLoaded", move |_| f()).forget();
        } else {
            f();
        }
    }

    fn viewport_target(&self, event: ViewportEvent) -> &EventTarget {
        match event {
            ViewportEvent::Scroll => self.document.as_ref(),
            ViewportEvent::Resize | ViewportEvent::OrientationChange => self.window.as_ref(),
        }
    }
}

/// A DOM element handle.
#[derive(Clone, Debug, PartialEq)]
pub struct WebElement(pub Element);

impl MediaElement for WebElement {
    fn tag_name(&self) -> String {
        self.0.tag_name().to_ascii_lowercase()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn set_attribute(&self, name: &str, value: &str) {
        warn_on_err("setAttribute", self.0.set_attribute(name, value));
    }

    fn remove_attribute(&self, name: &str) {
        warn_on_err("removeAttribute", self.0.remove_attribute(name));
    }

    fn has_class(&self, class: &str) -> bool {
        self.0.class_list().contains(class)
    }

    fn add_class(&self, class: &str) {
        warn_on_err("classList.add", self.0.class_list().add_1(class));
    }

    fn closest(&self, selector: &str) -> Option<Self> {
        match self.0.closest(selector) {
            Ok(found) => found.map(WebElement),
            Err(err) => {
                log::warn!("{}", host_error("closest", err));
                None
            }
        }
    }

    fn query_descendant(&self, selector: &str) -> Option<Self> {
        match self.0.query_selector(selector) {
            Ok(found) => found.map(WebElement),
            Err(err) => {
                log::warn!("{}", host_error("querySelector", err));
                None
            }
        }
    }

    fn append_source(&self, src: &str, mime: &str) {
        let Some(document) = self.0.owner_document() else {
            return;
        };
        let source = match document.create_element("source") {
            Ok(source) => source,
            Err(err) => {
                log::warn!("{}", host_error("createElement", err));
                return;
            }
        };
        warn_on_err("setAttribute", source.set_attribute("src", src));
        warn_on_err("setAttribute", source.set_attribute("type", mime));
        warn_on_err("appendChild", self.0.append_child(&source).map(drop));
    }

    fn reload(&self) {
        if let Some(media) = self.0.dyn_ref::<HtmlMediaElement>() {
            media.load();
        }
    }

    fn offset_top(&self) -> f64 {
        self.0
            .dyn_ref::<HtmlElement>()
            .map(|element| f64::from(element.offset_top()))
            .unwrap_or(0.0)
    }

    fn is_complete(&self) -> bool {
        if let Some(image) = self.0.dyn_ref::<HtmlImageElement>() {
            image.complete()
        } else if let Some(media) = self.0.dyn_ref::<HtmlMediaElement>() {
            media.ready_state() >= HAVE_CURRENT_DATA
        } else {
            false
        }
    }

    fn once(&self, event: &str, callback: Box<dyn FnOnce()>) {
        // Each listener owns the pair until one of them fires and drops both.
        let slot: Rc<RefCell<Option<[EventListener; 2]>>> = Rc::default();
        let on_done = slot.clone();
        let done = EventListener::once(&self.0, event.to_string(), move |_| {
            let listeners = on_done.borrow_mut().take();
            callback();
            drop(listeners);
        });
        let on_error = slot.clone();
        let target = self.0.clone();
        let failed = EventListener::once(&self.0, "error", move |_| {
            let listeners = on_error.borrow_mut().take();
            log::debug!("load failed, listener released: {}", target.tag_name());
            drop(listeners);
        });
        *slot.borrow_mut() = Some([done, failed]);
    }
}

/// Native observer plus the closure it calls into. Disconnects on drop.
struct WebObserver {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array)>,
}

impl IntersectionObserverHandle<WebElement> for WebObserver {
    fn observe(&self, target: &WebElement) {
        self.observer.observe(&target.0);
    }

    fn unobserve(&self, target: &WebElement) {
        self.observer.unobserve(&target.0);
    }

    fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for WebObserver {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

impl PageHost for WebPage {
    type Element = WebElement;

    fn query_all(&self, selector: &str) -> Vec<WebElement> {
        let list = match self.document.query_selector_all(selector) {
            Ok(list) => list,
            Err(err) => {
                log::warn!("{}", host_error("querySelectorAll", err));
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|index| list.get(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(WebElement)
            .collect()
    }

    fn scroll_offset(&self) -> f64 {
        self.window.page_y_offset().unwrap_or(0.0)
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|height| height.as_f64())
            .unwrap_or(0.0)
    }

    fn supports_intersection_observer(&self) -> bool {
        Reflect::has(&self.window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
    }

    fn observe_intersections(
        &self,
        options: &ObserverOptions,
        callback: IntersectionCallback<WebElement>,
    ) -> Result<Rc<dyn IntersectionObserverHandle<WebElement>>, LazyLoadError> {
        let closure = Closure::<dyn FnMut(Array)>::new(move |entries: Array| {
            let entries = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .map(|entry| IntersectionEntry {
                    target: WebElement(entry.target()),
                    is_intersecting: entry.is_intersecting(),
                })
                .collect();
            callback(entries);
        });

        let init = IntersectionObserverInit::new();
        init.set_root_margin(&options.root_margin);
        init.set_threshold(&JsValue::from_f64(options.threshold));
        let observer =
            IntersectionObserver::new_with_options(closure.as_ref().unchecked_ref(), &init)
                .map_err(|err| host_error("new IntersectionObserver", err))?;

        Ok(Rc::new(WebObserver {
            observer,
            _callback: closure,
        }))
    }

    fn listen_viewport(&self, event: ViewportEvent, callback: Rc<dyn Fn()>) -> Subscription {
        let target = self.viewport_target(event);
        Subscription::new(EventListener::new(target, event.event_name(), move |_| {
            callback()
        }))
    }

    fn listen_window(&self, event: &str, callback: Rc<dyn Fn()>) -> Subscription {
        Subscription::new(EventListener::new(
            &self.window,
            event.to_string(),
            move |_| callback(),
        ))
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Subscription {
        Subscription::new(Timeout::new(delay_ms, callback))
    }
}
