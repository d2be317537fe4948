use lumen_core::{ActivationState, MediaElement, MediaKind};
use lumen_foundation::{DetectionStrategy, LazyLoadConfig, LazyLoadController};
use lumen_testing::{PageTestRule, TestPage};

const VIEWPORT: f64 = 800.0;

#[test]
fn deferred_image_below_the_fold_loads_on_scroll() {
    let rule = PageTestRule::new(VIEWPORT);
    let page = rule.page();
    let picture = page.create("picture").class("lazy-picture").offset_top(2400.0).build();
    let image = page
        .create("img")
        .inside(&picture)
        .class("lazy-image")
        .attr("data-src", "photo.jpg")
        .offset_top(2400.0)
        .build();

    let _controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    rule.settle();

    assert_eq!(image.attribute("src"), None);
    assert_eq!(image.attribute("data-src").as_deref(), Some("photo.jpg"));
    rule.assert_state(MediaKind::Image, &image, ActivationState::Pending);

    rule.scroll_into_view(&image);
    assert_eq!(image.attribute("src").as_deref(), Some("photo.jpg"));
    assert_eq!(image.attribute("data-src"), None);
    rule.assert_state(MediaKind::Image, &image, ActivationState::Activating);
    rule.assert_not_loaded(&picture);

    page.finish_loading(&image);
    rule.assert_loaded(&image);
    rule.assert_loaded(&picture);
    rule.assert_idle();
}

#[test]
fn deferred_video_gets_one_typed_source_on_entry() {
    let rule = PageTestRule::new(VIEWPORT);
    let page = rule.page();
    let video = page
        .create("video")
        .class("lazy-video-element")
        .attr("data-lazy-video-src", "clip.mp4")
        .offset_top(3000.0)
        .build();

    let controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    rule.settle();
    assert!(video.children().is_empty());

    rule.scroll_into_view(&video);
    let sources = video.children();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].attribute("src").as_deref(), Some("clip.mp4"));
    assert_eq!(sources[0].attribute("type").as_deref(), Some("video/mp4"));
    assert_eq!(video.attribute("data-lazy-video-src"), None);
    assert_eq!(video.reload_count(), 1);

    page.finish_loading(&video);
    rule.assert_loaded(&video);
    assert_eq!(controller.stats().kind(MediaKind::Video).activated, 1);
}

#[test]
fn video_observer_reaches_fifty_pixels_past_the_fold() {
    let rule = PageTestRule::new(VIEWPORT);
    let page = rule.page();
    let video = page
        .create("video")
        .class("lazy-video-element")
        .attr("data-lazy-video-src", "clip.mp4")
        .offset_top(VIEWPORT + 40.0)
        .build();

    let _controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    rule.settle();
    assert_eq!(video.children().len(), 1);
}

#[test]
fn tall_image_straddling_the_viewport_top_is_visible() {
    let rule = PageTestRule::new(VIEWPORT);
    let page = rule.page();
    page.set_scroll_offset(5000.0);
    let banner = page
        .create("img")
        .class("lazy-image")
        .attr("data-src", "banner.jpg")
        .offset_top(3000.0)
        .height(2500.0)
        .build();
    let thumb = page
        .create("img")
        .class("lazy-image")
        .attr("data-src", "thumb.jpg")
        .offset_top(3000.0)
        .build();

    let _controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    rule.settle();

    assert_eq!(banner.attribute("src").as_deref(), Some("banner.jpg"));
    rule.assert_state(MediaKind::Image, &thumb, ActivationState::Pending);
}

#[test]
fn polling_fallback_activates_only_elements_within_threshold() {
    let rule = PageTestRule::with_page(TestPage::new(VIEWPORT).without_intersection_observer());
    let page = rule.page();
    let near = page
        .create("img")
        .class("lazy-image")
        .attr("data-src", "near.jpg")
        .offset_top(1500.0)
        .build();
    let far = page
        .create("img")
        .class("lazy-image")
        .attr("data-src", "far.jpg")
        .offset_top(4000.0)
        .build();

    let controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    assert_eq!(
        controller.strategy(MediaKind::Image),
        Some(DetectionStrategy::Polling)
    );

    page.scroll_to(1000.0);
    assert_eq!(page.pending_timer_count(), 1);
    assert_eq!(near.attribute("src"), None, "activation waits for the quiet period");

    page.advance_time(20);
    assert_eq!(near.attribute("src").as_deref(), Some("near.jpg"));
    assert_eq!(far.attribute("src"), None);
    assert_eq!(far.attribute("data-src").as_deref(), Some("far.jpg"));
    assert_eq!(page.viewport_listener_count(), 3);

    page.scroll_to(3500.0);
    page.advance_time(20);
    assert_eq!(far.attribute("src").as_deref(), Some("far.jpg"));
    rule.assert_idle();
}

#[test]
fn page_without_deferred_media_stays_idle() {
    let rule = PageTestRule::new(VIEWPORT);
    rule.page().create("img").attr("src", "logo.png").build();

    let controller = LazyLoadController::install(rule.page().clone(), LazyLoadConfig::default());

    rule.assert_idle();
    assert_eq!(rule.page().observer_count(), 0);
    for kind in MediaKind::ALL {
        assert!(controller.detector(kind).is_none(), "{kind} detector");
    }
}

#[test]
fn polling_page_without_deferred_media_stays_idle() {
    let rule = PageTestRule::with_page(TestPage::new(VIEWPORT).without_intersection_observer());
    let _controller = LazyLoadController::install(rule.page().clone(), LazyLoadConfig::default());
    rule.page().scroll_to(500.0);
    rule.assert_idle();
}

#[test]
fn vector_objects_receive_their_data_reference() {
    let rule = PageTestRule::new(VIEWPORT);
    let page = rule.page();
    let icon = page
        .create("object")
        .class("lazy-svg")
        .attr("data-src", "icon.svg")
        .offset_top(100.0)
        .build();

    let _controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    rule.settle();

    assert_eq!(icon.attribute("data").as_deref(), Some("icon.svg"));
    page.finish_loading(&icon);
    rule.assert_loaded(&icon);
}

#[test]
fn videos_inserted_later_are_found_by_recheck_event() {
    let rule = PageTestRule::new(VIEWPORT);
    let page = rule.page();
    let controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    assert!(controller.detector(MediaKind::Video).is_none());

    let injected = page
        .create("video")
        .class("lazy-video-element")
        .attr("data-lazy-video-src", "late.mp4")
        .offset_top(200.0)
        .build();
    page.dispatch_window_event("lazyVideoRecheck");
    rule.settle();

    assert_eq!(injected.children().len(), 1);
    assert_eq!(controller.stats().kind(MediaKind::Video).discovered, 1);
}

#[test]
fn eager_video_fallback_skips_detection() {
    let rule = PageTestRule::with_page(TestPage::new(VIEWPORT).without_intersection_observer());
    let page = rule.page();
    let video = page
        .create("video")
        .class("lazy-video-element")
        .attr("data-lazy-video-src", "clip.mp4")
        .offset_top(5000.0)
        .build();

    let controller = LazyLoadController::install(
        page.clone(),
        LazyLoadConfig::default().with_eager_video_fallback(true),
    );

    assert_eq!(video.children().len(), 1);
    assert!(controller.detector(MediaKind::Video).is_none());
    rule.assert_idle();
}
