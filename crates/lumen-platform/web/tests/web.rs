#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use lumen_core::{MediaElement, PageHost, ViewportEvent};
use lumen_platform_web::{WebElement, WebPage};
use wasm_bindgen_test::*;
use web_sys::{Document, Event};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window()
        .and_then(|window| window.document())
        .expect("document")
}

fn mount(tag: &str, class: &str) -> WebElement {
    let document = document();
    let element = document.create_element(tag).expect("create element");
    element.set_class_name(class);
    document
        .body()
        .expect("body")
        .append_child(&element)
        .expect("append");
    WebElement(element)
}

fn dispatch(element: &WebElement, name: &str) {
    let event = Event::new(name).expect("event");
    element.0.dispatch_event(&event).expect("dispatch");
}

#[wasm_bindgen_test]
fn query_all_returns_document_order() {
    let first = mount("img", "lumen-order");
    let second = mount("video", "lumen-order");
    let third = mount("img", "lumen-order");

    let page = WebPage::new().expect("page");
    assert_eq!(page.query_all(".lumen-order"), vec![first, second, third]);
    assert!(page.query_all(".lumen-absent").is_empty());
}

#[wasm_bindgen_test]
fn append_source_adds_typed_child() {
    let video = mount("video", "lumen-source");
    video.append_source("clip.webm", "video/webm");

    let source = video.query_descendant("source").expect("source child");
    assert_eq!(source.attribute("src").as_deref(), Some("clip.webm"));
    assert_eq!(source.attribute("type").as_deref(), Some("video/webm"));
    assert_eq!(video.0.child_element_count(), 1);
}

#[wasm_bindgen_test]
fn fresh_media_is_not_complete() {
    assert!(!mount("video", "lumen-complete").is_complete());
    assert!(!mount("object", "lumen-complete").is_complete());
}

#[wasm_bindgen_test]
fn once_fires_a_single_time() {
    let image = mount("img", "lumen-once");
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    image.once("load", Box::new(move || counter.set(counter.get() + 1)));

    dispatch(&image, "load");
    dispatch(&image, "load");
    assert_eq!(hits.get(), 1);
}

#[wasm_bindgen_test]
fn once_is_released_by_error() {
    let image = mount("img", "lumen-error");
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    image.once("load", Box::new(move || counter.set(counter.get() + 1)));

    dispatch(&image, "error");
    dispatch(&image, "load");
    assert_eq!(hits.get(), 0);
}

#[wasm_bindgen_test]
fn scroll_subscription_detaches_on_drop() {
    let page = WebPage::new().expect("page");
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    let subscription = page.listen_viewport(
        ViewportEvent::Scroll,
        Rc::new(move || counter.set(counter.get() + 1)),
    );

    let scroll = || {
        document()
            .dispatch_event(&Event::new("scroll").expect("event"))
            .expect("dispatch");
    };
    scroll();
    assert_eq!(hits.get(), 1);

    drop(subscription);
    scroll();
    assert_eq!(hits.get(), 1);
}
