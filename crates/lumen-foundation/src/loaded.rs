//! Mirrors resource completion into the loaded class.

use std::rc::Rc;

use lumen_core::{MarkupContract, MediaElement, MediaKind};

use crate::deferred::enclosing_composite;

/// What [`LoadedStateSync::sync`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The resource was already complete; the class is applied.
    Marked,
    /// A one-shot completion listener will apply the class.
    Deferred,
}

/// Applies the loaded class to an element, and to its composite wrapper when
/// the kind has one, once the resource finishes loading.
#[derive(Clone, Debug)]
pub struct LoadedStateSync {
    kind: MediaKind,
    loaded_class: Rc<str>,
    composite: Option<Rc<str>>,
}

impl LoadedStateSync {
    pub fn new(kind: MediaKind, markup: &MarkupContract) -> Self {
        Self {
            kind,
            loaded_class: Rc::from(markup.loaded_class.as_str()),
            composite: markup.composite(kind).map(Rc::from),
        }
    }

    pub fn sync<E: MediaElement>(&self, element: &E) -> SyncOutcome {
        if element.is_complete() {
            self.mark_loaded(element);
            return SyncOutcome::Marked;
        }
        let sync = self.clone();
        let target = element.clone();
        element.once(
            self.kind.completion_event(),
            Box::new(move || sync.mark_loaded(&target)),
        );
        SyncOutcome::Deferred
    }

    /// Adds the loaded class. Idempotent.
    pub fn mark_loaded<E: MediaElement>(&self, element: &E) {
        element.add_class(&self.loaded_class);
        if let Some(composite) = self
            .composite
            .as_deref()
            .and_then(|selector| enclosing_composite(element, selector))
        {
            composite.add_class(&self.loaded_class);
        }
        log::trace!("{} marked loaded: {element:?}", self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_testing::TestPage;

    #[test]
    fn complete_image_is_marked_immediately() {
        let page = TestPage::new(600.0);
        let picture = page.create("picture").class("lazy-picture").build();
        let image = page.create("img").inside(&picture).complete().build();
        let sync = LoadedStateSync::new(MediaKind::Image, &MarkupContract::default());

        assert_eq!(sync.sync(&image), SyncOutcome::Marked);
        assert!(image.has_class("loaded"));
        assert!(picture.has_class("loaded"));
        assert_eq!(page.pending_element_listener_count(&image), 0);
    }

    #[test]
    fn incomplete_image_waits_for_load() {
        let page = TestPage::new(600.0);
        let image = page.create("img").build();
        let sync = LoadedStateSync::new(MediaKind::Image, &MarkupContract::default());

        assert_eq!(sync.sync(&image), SyncOutcome::Deferred);
        assert!(!image.has_class("loaded"));

        page.finish_loading(&image);
        assert!(image.has_class("loaded"));
        assert_eq!(page.pending_element_listener_count(&image), 0);
    }

    #[test]
    fn failed_image_drops_its_listener_and_stays_unloaded() {
        let page = TestPage::new(600.0);
        let picture = page.create("picture").class("lazy-picture").build();
        let image = page.create("img").inside(&picture).build();
        let sync = LoadedStateSync::new(MediaKind::Image, &MarkupContract::default());

        assert_eq!(sync.sync(&image), SyncOutcome::Deferred);
        assert_eq!(page.pending_element_listener_count(&image), 1);

        page.fail_loading(&image);
        assert_eq!(page.pending_element_listener_count(&image), 0);
        assert!(!image.has_class("loaded"));
        assert!(!picture.has_class("loaded"));
    }

    #[test]
    fn video_waits_for_loadeddata_and_ignores_composites() {
        let page = TestPage::new(600.0);
        let picture = page.create("picture").build();
        let video = page.create("video").inside(&picture).build();
        let sync = LoadedStateSync::new(MediaKind::Video, &MarkupContract::default());

        sync.sync(&video);
        page.dispatch_element_event(&video, "load");
        assert!(!video.has_class("loaded"));

        page.dispatch_element_event(&video, "loadeddata");
        assert!(video.has_class("loaded"));
        assert!(!picture.has_class("loaded"));
    }

    #[test]
    fn marking_twice_keeps_one_class() {
        let page = TestPage::new(600.0);
        let image = page.create("img").build();
        let sync = LoadedStateSync::new(MediaKind::Image, &MarkupContract::default());
        sync.mark_loaded(&image);
        sync.mark_loaded(&image);
        assert_eq!(image.classes(), ["loaded"]);
    }
}
