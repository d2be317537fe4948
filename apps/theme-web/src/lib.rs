use std::cell::RefCell;
use std::rc::Rc;

use lumen_foundation::{LazyLoadConfig, LazyLoadController};
use lumen_platform_web::WebPage;
use wasm_bindgen::prelude::*;

thread_local! {
    static CONTROLLER: RefCell<Option<LazyLoadController<WebPage>>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn web_init() {
    wasm_logger::init(wasm_logger::Config::default());
    console_error_panic_hook::set_once();

    let page = match WebPage::new() {
        Ok(page) => Rc::new(page),
        Err(err) => {
            log::error!("lazy media disabled: {err}");
            return;
        }
    };
    let ready = page.clone();
    page.on_ready(move || {
        let controller = LazyLoadController::install(ready, LazyLoadConfig::default());
        CONTROLLER.with(|slot| *slot.borrow_mut() = Some(controller));
    });
}

/// Rescans for deferred videos added after page load. Same effect as
/// dispatching `lazyVideoRecheck` on the window.
#[wasm_bindgen(js_name = recheckLazyVideos)]
pub fn recheck_lazy_videos() -> usize {
    CONTROLLER.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(0, |controller| controller.recheck_videos())
    })
}
