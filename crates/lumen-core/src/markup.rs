//! Attribute, class and selector names shared with theme templates and stylesheets.
//!
//! Templates emit deferred media with a marker attribute holding the real URL
//! and a kind class; stylesheets key fade-in transitions on the loaded class.
//! Every name is overridable so a theme can keep its existing markup.

use crate::kind::MediaKind;

/// Names the engine reads from and writes to the page.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkupContract {
    /// Class carried by every lazily handled `<img>`.
    pub image_class: String,
    /// Attribute holding a deferred image URL.
    pub image_marker: String,

    /// Class carried by `<object>` elements embedding SVG.
    pub vector_class: String,
    /// Attribute holding a deferred SVG URL.
    pub vector_marker: String,

    /// Class carried by lazily handled `<video>` elements.
    pub video_class: String,
    /// Attribute holding a deferred video URL.
    pub video_marker: String,
    /// MIME type written on the generated `<source>` element.
    pub video_mime: String,

    /// Class on `<picture>` wrappers whose image should be synced at start-up.
    pub picture_class: String,
    /// Selector for the composite wrapper mirroring an image's loaded state.
    pub image_composite: String,

    /// Terminal class applied once the host reports completion.
    pub loaded_class: String,
    /// Window event requesting a video re-scan.
    pub recheck_event: String,
}

impl Default for MarkupContract {
    fn default() -> Self {
        Self {
            image_class: "lazy-image".into(),
            image_marker: "data-src".into(),
            vector_class: "lazy-svg".into(),
            vector_marker: "data-src".into(),
            video_class: "lazy-video-element".into(),
            video_marker: "data-lazy-video-src".into(),
            video_mime: "video/mp4".into(),
            picture_class: "lazy-picture".into(),
            image_composite: "picture".into(),
            loaded_class: "loaded".into(),
            recheck_event: "lazyVideoRecheck".into(),
        }
    }
}

impl MarkupContract {
    /// Marker attribute holding the pending URL for `kind`.
    pub fn marker(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.image_marker,
            MediaKind::VectorObject => &self.vector_marker,
            MediaKind::Video => &self.video_marker,
        }
    }

    /// Class distinguishing lazily handled elements of `kind`.
    pub fn class(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.image_class,
            MediaKind::VectorObject => &self.vector_class,
            MediaKind::Video => &self.video_class,
        }
    }

    /// Composite wrapper selector for `kind`, if the kind has one.
    pub fn composite(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Image if !self.image_composite.is_empty() => Some(&self.image_composite),
            _ => None,
        }
    }

    /// Selector matching elements of `kind` that still withhold their source.
    ///
    /// `img.lazy-image[data-src]`, `object.lazy-svg[data-src]`,
    /// `video.lazy-video-element[data-lazy-video-src]` with the default names.
    pub fn deferred_selector(&self, kind: MediaKind) -> String {
        format!("{}.{}[{}]", kind.tag_name(), self.class(kind), self.marker(kind))
    }

    /// Selector for lazy images that were rendered with their source in place.
    pub fn resolved_image_selector(&self) -> String {
        format!("img.{}:not([{}])", self.image_class, self.image_marker)
    }

    /// Selector for images nested in `picture.lazy-picture` wrappers.
    pub fn picture_image_selector(&self) -> String {
        format!("{}.{} img", self.image_composite, self.picture_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selectors_match_theme_markup() {
        let markup = MarkupContract::default();
        assert_eq!(
            markup.deferred_selector(MediaKind::Image),
            "img.lazy-image[data-src]"
        );
        assert_eq!(
            markup.deferred_selector(MediaKind::VectorObject),
            "object.lazy-svg[data-src]"
        );
        assert_eq!(
            markup.deferred_selector(MediaKind::Video),
            "video.lazy-video-element[data-lazy-video-src]"
        );
        assert_eq!(
            markup.resolved_image_selector(),
            "img.lazy-image:not([data-src])"
        );
        assert_eq!(markup.picture_image_selector(), "picture.lazy-picture img");
    }

    #[test]
    fn only_images_have_a_composite_by_default() {
        let markup = MarkupContract::default();
        assert_eq!(markup.composite(MediaKind::Image), Some("picture"));
        assert_eq!(markup.composite(MediaKind::VectorObject), None);
        assert_eq!(markup.composite(MediaKind::Video), None);
    }

    #[test]
    fn empty_composite_disables_propagation() {
        let markup = MarkupContract {
            image_composite: String::new(),
            ..MarkupContract::default()
        };
        assert_eq!(markup.composite(MediaKind::Image), None);
    }
}
