//! Engine configuration.

use lumen_core::{MarkupContract, MediaKind, ObserverOptions};

/// Quiet period after the last scroll/resize before polling re-evaluates.
pub const DEFAULT_DEBOUNCE_MS: u32 = 20;

/// How one kind's detector watches the viewport.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorOptions {
    /// Debounce used by the polling fallback.
    pub debounce_ms: u32,

    /// Options for native intersection observation.
    pub observer: ObserverOptions,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            observer: ObserverOptions::default(),
        }
    }
}

impl DetectorOptions {
    /// Creates options with the given polling debounce.
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            ..Self::default()
        }
    }

    /// Videos start fetching slightly before they scroll in.
    pub fn video() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            observer: ObserverOptions {
                root_margin: "50px 0px".into(),
                threshold: 0.01,
            },
        }
    }

    pub fn with_root_margin(mut self, root_margin: impl Into<String>) -> Self {
        self.observer.root_margin = root_margin.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.observer.threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

/// Configuration for [`crate::LazyLoadController`].
#[derive(Clone, Debug, PartialEq)]
pub struct LazyLoadConfig {
    /// Attribute and class names shared with templates.
    pub markup: MarkupContract,

    pub image: DetectorOptions,
    pub vector: DetectorOptions,
    pub video: DetectorOptions,

    /// Ignore host support for intersection observation and always poll.
    pub force_polling: bool,

    /// Without native observation, activate videos at once instead of polling.
    pub eager_video_fallback: bool,

    /// Subscribe to the window-level video recheck event.
    pub listen_for_recheck: bool,
}

impl Default for LazyLoadConfig {
    fn default() -> Self {
        Self {
            markup: MarkupContract::default(),
            image: DetectorOptions::default(),
            vector: DetectorOptions::default(),
            video: DetectorOptions::video(),
            force_polling: false,
            eager_video_fallback: false,
            listen_for_recheck: true,
        }
    }
}

impl LazyLoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markup(mut self, markup: MarkupContract) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_detector(mut self, kind: MediaKind, options: DetectorOptions) -> Self {
        match kind {
            MediaKind::Image => self.image = options,
            MediaKind::VectorObject => self.vector = options,
            MediaKind::Video => self.video = options,
        }
        self
    }

    pub fn with_force_polling(mut self, force: bool) -> Self {
        self.force_polling = force;
        self
    }

    pub fn with_eager_video_fallback(mut self, eager: bool) -> Self {
        self.eager_video_fallback = eager;
        self
    }

    pub fn without_recheck_listener(mut self) -> Self {
        self.listen_for_recheck = false;
        self
    }

    pub fn detector(&self, kind: MediaKind) -> &DetectorOptions {
        match kind {
            MediaKind::Image => &self.image,
            MediaKind::VectorObject => &self.vector,
            MediaKind::Video => &self.video,
        }
    }
}
