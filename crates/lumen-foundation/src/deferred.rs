//! A media element seen through the lazy-loading lifecycle.

use lumen_core::{ActivationState, MarkupContract, MediaElement, MediaKind};

/// Deferred URL stored in `marker`, if any. Empty values count as absent.
pub fn pending_source<E: MediaElement>(element: &E, marker: &str) -> Option<String> {
    element.attribute(marker).filter(|value| !value.is_empty())
}

/// Nearest ancestor matching `selector`, excluding `element` itself.
pub fn enclosing_composite<E: MediaElement>(element: &E, selector: &str) -> Option<E> {
    element
        .closest(selector)
        .filter(|composite| composite != element)
}

/// One media item and its kind.
///
/// State is not stored: it is read back from the markup, so the
/// pending-source attribute is present exactly while the element is
/// [`ActivationState::Pending`].
#[derive(Clone, Debug, PartialEq)]
pub struct DeferredElement<E> {
    kind: MediaKind,
    element: E,
}

impl<E: MediaElement> DeferredElement<E> {
    pub fn new(kind: MediaKind, element: E) -> Self {
        Self { kind, element }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn pending_source(&self, markup: &MarkupContract) -> Option<String> {
        pending_source(&self.element, markup.marker(self.kind))
    }

    pub fn state(&self, markup: &MarkupContract) -> ActivationState {
        if self.element.has_class(&markup.loaded_class) {
            ActivationState::Loaded
        } else if self.pending_source(markup).is_some() {
            ActivationState::Pending
        } else {
            ActivationState::Activating
        }
    }

    /// Wrapper whose loaded state mirrors this element; `None` when the kind
    /// has no composite or no such ancestor exists.
    pub fn enclosing_composite(&self, markup: &MarkupContract) -> Option<E> {
        markup
            .composite(self.kind)
            .and_then(|selector| enclosing_composite(&self.element, selector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_testing::TestPage;

    #[test]
    fn state_follows_markup() {
        let page = TestPage::new(600.0);
        let markup = MarkupContract::default();
        let image = page
            .create("img")
            .class("lazy-image")
            .attr("data-src", "photo.jpg")
            .build();
        let deferred = DeferredElement::new(MediaKind::Image, image.clone());

        assert_eq!(deferred.state(&markup), ActivationState::Pending);
        assert_eq!(deferred.pending_source(&markup).as_deref(), Some("photo.jpg"));

        image.remove_attribute("data-src");
        assert_eq!(deferred.state(&markup), ActivationState::Activating);
        assert_eq!(deferred.pending_source(&markup), None);

        image.add_class("loaded");
        assert_eq!(deferred.state(&markup), ActivationState::Loaded);
    }

    #[test]
    fn empty_marker_is_not_pending() {
        let page = TestPage::new(600.0);
        let image = page.create("img").attr("data-src", "").build();
        let deferred = DeferredElement::new(MediaKind::Image, image);
        assert_eq!(deferred.pending_source(&MarkupContract::default()), None);
    }

    #[test]
    fn composite_lookup_is_null_safe() {
        let page = TestPage::new(600.0);
        let markup = MarkupContract::default();
        let picture = page.create("picture").build();
        let wrapped = page.create("img").inside(&picture).build();
        let loose = page.create("img").build();

        let wrapped = DeferredElement::new(MediaKind::Image, wrapped);
        let loose = DeferredElement::new(MediaKind::Image, loose);
        assert_eq!(wrapped.enclosing_composite(&markup), Some(picture));
        assert_eq!(loose.enclosing_composite(&markup), None);

        let video = page.create("video").inside(&page.create("picture").build()).build();
        let video = DeferredElement::new(MediaKind::Video, video);
        assert_eq!(video.enclosing_composite(&markup), None);
    }
}
