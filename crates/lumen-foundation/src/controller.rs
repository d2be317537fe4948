//! Page-level orchestration.
//!
//! [`LazyLoadController::install`] runs the discovery pass once the document
//! is ready: vector objects, then images (plus a loaded-state pass over images
//! that never had a deferred source), then videos. Each kind gets its own
//! [`VisibilityDetector`] whose signal activates the element and hands it to
//! [`LoadedStateSync`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use lumen_core::collections::map::HashMap;
use lumen_core::{ActivationState, MediaElement, MediaKind, PageHost, Subscription};

use crate::activator::{activator_for, Activation};
use crate::config::LazyLoadConfig;
use crate::deferred::DeferredElement;
use crate::detector::{DetectionStrategy, VisibilityDetector};
use crate::loaded::LoadedStateSync;

/// Counters for one media kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindStats {
    /// Elements handed to a detector (or activated eagerly).
    pub discovered: usize,
    pub activated: usize,
    pub skipped: usize,
    /// Already-resolved images passed straight to loaded-state sync.
    pub synced: usize,
}

/// Snapshot of what the controller has done so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LazyLoadStats {
    kinds: HashMap<MediaKind, KindStats>,
}

impl LazyLoadStats {
    pub fn kind(&self, kind: MediaKind) -> KindStats {
        self.kinds.get(&kind).copied().unwrap_or_default()
    }

    fn kind_mut(&mut self, kind: MediaKind) -> &mut KindStats {
        self.kinds.entry(kind).or_default()
    }
}

/// Owns the per-kind detectors for one page.
///
/// Cloning yields another handle to the same controller. Dropping the last
/// handle disconnects observers and detaches every listener the controller
/// registered.
pub struct LazyLoadController<H: PageHost> {
    inner: Rc<RefCell<ControllerInner<H>>>,
}

impl<H: PageHost> Clone for LazyLoadController<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ControllerInner<H: PageHost> {
    host: Rc<H>,
    config: Rc<LazyLoadConfig>,
    detectors: HashMap<MediaKind, VisibilityDetector<H>>,
    stats: Rc<RefCell<LazyLoadStats>>,
    recheck: Option<Subscription>,
}

impl<H: PageHost> LazyLoadController<H> {
    /// Discovers deferred media on `host` and starts detection.
    pub fn install(host: Rc<H>, config: LazyLoadConfig) -> Self {
        let controller = Self {
            inner: Rc::new(RefCell::new(ControllerInner {
                host,
                config: Rc::new(config),
                detectors: HashMap::default(),
                stats: Rc::default(),
                recheck: None,
            })),
        };

        controller.discover(MediaKind::VectorObject);
        controller.discover(MediaKind::Image);
        controller.sync_resolved_images();
        controller.discover(MediaKind::Video);
        controller.listen_for_recheck();
        controller.start();

        let stats = controller.stats();
        log::info!(
            "lazy media installed: {} vector objects, {} images, {} videos",
            stats.kind(MediaKind::VectorObject).discovered,
            stats.kind(MediaKind::Image).discovered,
            stats.kind(MediaKind::Video).discovered,
        );
        controller
    }

    /// Rescans for deferred videos inserted after install. Returns how many
    /// new videos were picked up.
    ///
    /// Videos already watched, already activated or still activating are
    /// left alone.
    pub fn recheck_videos(&self) -> usize {
        let added = self.discover(MediaKind::Video);
        if let Some(detector) = self.detector(MediaKind::Video) {
            detector.start();
        }
        log::debug!("video recheck picked up {added} new element(s)");
        added
    }

    pub fn config(&self) -> Rc<LazyLoadConfig> {
        self.inner.borrow().config.clone()
    }

    pub fn stats(&self) -> LazyLoadStats {
        self.inner.borrow().stats.borrow().clone()
    }

    /// Detector for `kind`, if discovery found anything to watch.
    pub fn detector(&self, kind: MediaKind) -> Option<VisibilityDetector<H>> {
        self.inner.borrow().detectors.get(&kind).cloned()
    }

    pub fn strategy(&self, kind: MediaKind) -> Option<DetectionStrategy> {
        self.detector(kind).map(|detector| detector.strategy())
    }

    /// Lifecycle position of `element`, read back from its markup.
    pub fn state_of(&self, kind: MediaKind, element: &H::Element) -> ActivationState {
        let config = self.config();
        DeferredElement::new(kind, element.clone()).state(&config.markup)
    }

    fn host(&self) -> Rc<H> {
        self.inner.borrow().host.clone()
    }

    fn discover(&self, kind: MediaKind) -> usize {
        let host = self.host();
        let config = self.config();
        let candidates: Vec<H::Element> = host
            .query_all(&config.markup.deferred_selector(kind))
            .into_iter()
            .filter(|element| {
                DeferredElement::new(kind, element.clone()).state(&config.markup)
                    == ActivationState::Pending
            })
            .collect();
        if candidates.is_empty() {
            log::debug!("no deferred {kind} elements");
            return 0;
        }

        let eager = kind == MediaKind::Video
            && config.eager_video_fallback
            && !host.supports_intersection_observer();
        let added = if eager {
            log::debug!("no intersection observer, activating {kind} elements eagerly");
            let activate = self.visibility_handler(kind);
            candidates.iter().for_each(|element| activate(element));
            candidates.len()
        } else {
            let detector = self.detector_or_create(kind);
            candidates
                .into_iter()
                .filter(|element| detector.watch(element.clone()))
                .count()
        };
        self.record(kind, |stats| stats.discovered += added);
        added
    }

    /// Images that were never deferred (or sit in a lazy `<picture>` without a
    /// marker) still get the loaded class once their resource completes.
    fn sync_resolved_images(&self) {
        let host = self.host();
        let config = self.config();
        let markup = &config.markup;
        let marker = markup.marker(MediaKind::Image);

        let mut images = host.query_all(&markup.resolved_image_selector());
        for image in host.query_all(&markup.picture_image_selector()) {
            if !images.contains(&image) && image.attribute(marker).is_none() {
                images.push(image);
            }
        }

        let sync = LoadedStateSync::new(MediaKind::Image, markup);
        for image in &images {
            sync.sync(image);
        }
        self.record(MediaKind::Image, |stats| stats.synced += images.len());
    }

    fn listen_for_recheck(&self) {
        let config = self.config();
        if !config.listen_for_recheck {
            return;
        }
        let controller: Weak<RefCell<ControllerInner<H>>> = Rc::downgrade(&self.inner);
        let subscription = self.host().listen_window(
            &config.markup.recheck_event,
            Rc::new(move || {
                if let Some(inner) = controller.upgrade() {
                    LazyLoadController { inner }.recheck_videos();
                }
            }),
        );
        self.inner.borrow_mut().recheck = Some(subscription);
    }

    fn start(&self) {
        for kind in MediaKind::ALL {
            if let Some(detector) = self.detector(kind) {
                detector.start();
            }
        }
    }

    fn detector_or_create(&self, kind: MediaKind) -> VisibilityDetector<H> {
        if let Some(detector) = self.detector(kind) {
            return detector;
        }
        let host = self.host();
        let config = self.config();
        let activate = self.visibility_handler(kind);
        let detector = VisibilityDetector::new(
            host,
            kind,
            config.detector(kind),
            config.force_polling,
            move |element: &H::Element| activate(element),
        );
        log::debug!("{kind} detector using {:?}", detector.strategy());
        self.inner
            .borrow_mut()
            .detectors
            .insert(kind, detector.clone());
        detector
    }

    /// Signal run when an element of `kind` becomes visible.
    fn visibility_handler(&self, kind: MediaKind) -> Rc<dyn Fn(&H::Element)> {
        let config = self.config();
        let activator = activator_for::<H::Element>(kind, &config.markup);
        let loaded = LoadedStateSync::new(kind, &config.markup);
        let stats = self.inner.borrow().stats.clone();
        Rc::new(move |element: &H::Element| match activator.activate(element) {
            Activation::Activated => {
                log::debug!("activated {kind} {element:?}");
                stats.borrow_mut().kind_mut(kind).activated += 1;
                loaded.sync(element);
            }
            Activation::Skipped(reason) => {
                log::debug!("skipped {kind} {element:?}: {reason}");
                stats.borrow_mut().kind_mut(kind).skipped += 1;
            }
        })
    }

    fn record(&self, kind: MediaKind, update: impl FnOnce(&mut KindStats)) {
        let stats = self.inner.borrow().stats.clone();
        update(stats.borrow_mut().kind_mut(kind));
    }
}
