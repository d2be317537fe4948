use std::cell::RefCell;
use std::rc::Rc;

use lumen_core::{ActivationState, MarkupContract, MediaElement, MediaKind};
use lumen_foundation::{
    activator_for, DetectorOptions, LazyLoadConfig, LazyLoadController, VisibilityDetector,
};
use lumen_testing::{PageTestRule, TestElement, TestPage};

fn lazy_image(page: &TestPage, url: &str, offset_top: f64) -> TestElement {
    page.create("img")
        .class("lazy-image")
        .attr("data-src", url)
        .offset_top(offset_top)
        .build()
}

fn lazy_video(page: &TestPage, url: &str, offset_top: f64) -> TestElement {
    page.create("video")
        .class("lazy-video-element")
        .attr("data-lazy-video-src", url)
        .offset_top(offset_top)
        .build()
}

#[test]
fn each_element_is_signalled_once_per_watch() {
    for force_polling in [false, true] {
        let page = Rc::new(TestPage::new(600.0));
        let signals: Rc<RefCell<Vec<TestElement>>> = Rc::default();
        let sink = signals.clone();
        let detector = VisibilityDetector::new(
            page.clone(),
            MediaKind::Image,
            &DetectorOptions::default(),
            force_polling,
            move |element: &TestElement| sink.borrow_mut().push(element.clone()),
        );
        let elements: Vec<_> = (0..6)
            .map(|i| lazy_image(&page, &format!("{i}.jpg"), f64::from(i) * 700.0))
            .collect();
        for element in &elements {
            detector.watch(element.clone());
        }
        detector.start();

        for offset in [0.0, 1500.0, 300.0, 2900.0, 0.0, 3400.0] {
            page.scroll_to(offset);
            page.flush_intersections();
            page.advance_time(50);
        }
        assert_eq!(detector.watched_len(), 0, "polling={force_polling}");

        let signals = signals.borrow();
        assert_eq!(signals.len(), elements.len(), "polling={force_polling}");
        for element in &elements {
            assert_eq!(
                signals.iter().filter(|s| *s == element).count(),
                1,
                "{element:?} polling={force_polling}"
            );
        }
    }
}

#[test]
fn elements_in_the_initial_viewport_fire_without_events() {
    for force_polling in [false, true] {
        let rule = PageTestRule::new(600.0);
        let page = rule.page();
        let image = lazy_image(page, "hero.jpg", 0.0);

        let _controller = LazyLoadController::install(
            page.clone(),
            LazyLoadConfig::default().with_force_polling(force_polling),
        );
        if !force_polling {
            page.flush_intersections();
        }

        assert_eq!(image.attribute("src").as_deref(), Some("hero.jpg"));
        assert_eq!(page.pending_timer_count(), 0);
    }
}

#[test]
fn video_activation_attaches_exactly_one_source() {
    let rule = PageTestRule::new(600.0);
    let video = lazy_video(rule.page(), "clip.mp4", 0.0);
    let activator = activator_for::<TestElement>(MediaKind::Video, &MarkupContract::default());

    assert!(activator.activate(&video).is_activated());
    assert!(!activator.activate(&video).is_activated());
    assert_eq!(video.children().len(), 1);
    assert_eq!(video.reload_count(), 1);
}

#[test]
fn recheck_does_not_retrigger_activating_videos() {
    let rule = PageTestRule::new(600.0);
    let page = rule.page();
    let video = lazy_video(page, "clip.mp4", 0.0);
    let controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    rule.settle();
    rule.assert_state(MediaKind::Video, &video, ActivationState::Activating);

    // Markup re-rendered with the marker while the first load is in flight.
    video.set_attribute("data-lazy-video-src", "clip.mp4");
    page.dispatch_window_event("lazyVideoRecheck");
    assert_eq!(controller.recheck_videos(), 0);
    rule.settle();

    assert_eq!(video.children().len(), 1);
    assert_eq!(video.reload_count(), 1);
}

#[test]
fn loaded_state_never_regresses() {
    let rule = PageTestRule::new(600.0);
    let page = rule.page();
    let image = lazy_image(page, "a.jpg", 1200.0);
    let video = lazy_video(page, "b.mp4", 1400.0);
    let controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());

    let mut last = [ActivationState::Pending; 2];
    let mut observe = |step: &str| {
        let now = [
            controller.state_of(MediaKind::Image, &image),
            controller.state_of(MediaKind::Video, &video),
        ];
        for (before, after) in last.iter().zip(now) {
            assert!(before.can_advance_to(after), "{step}: {before:?} -> {after:?}");
        }
        last = now;
    };

    observe("install");
    rule.settle();
    observe("settle");
    rule.scroll_into_view(&image);
    observe("scroll");
    page.finish_loading(&image);
    page.finish_loading(&video);
    observe("loaded");
    rule.scroll_into_view(&image);
    page.dispatch_window_event("lazyVideoRecheck");
    rule.settle();
    observe("recheck");

    assert_eq!(last, [ActivationState::Loaded; 2]);
    assert!(last.iter().all(|state| state.is_terminal()));
    assert!(!ActivationState::Activating.is_terminal());
}

#[test]
fn loaded_class_reaches_the_wrapper_only_when_one_exists() {
    let rule = PageTestRule::new(600.0);
    let page = rule.page();
    let picture = page.create("picture").class("lazy-picture").build();
    let wrapped = page
        .create("img")
        .inside(&picture)
        .class("lazy-image")
        .attr("data-src", "wrapped.jpg")
        .build();
    let loose = lazy_image(page, "loose.jpg", 0.0);
    let container = page.create("div").build();
    let in_div = page
        .create("img")
        .inside(&container)
        .class("lazy-image")
        .attr("data-src", "div.jpg")
        .build();

    let _controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    rule.settle();
    for image in [&wrapped, &loose, &in_div] {
        page.finish_loading(image);
        rule.assert_loaded(image);
    }

    rule.assert_loaded(&picture);
    rule.assert_not_loaded(&container);
    rule.assert_not_loaded(&page.body());
}

#[test]
fn cached_images_are_marked_without_a_listener() {
    let rule = PageTestRule::new(600.0);
    let page = rule.page();
    let cached = page
        .create("img")
        .class("lazy-image")
        .attr("src", "cached.jpg")
        .complete()
        .build();

    let _controller = LazyLoadController::install(page.clone(), LazyLoadConfig::default());
    rule.assert_loaded(&cached);
    assert_eq!(page.pending_element_listener_count(&cached), 0);
}
