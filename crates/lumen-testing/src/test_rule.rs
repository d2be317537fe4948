use std::rc::Rc;

use lumen_core::{ActivationState, MarkupContract, MediaElement, MediaKind};

use crate::page::{TestElement, TestPage};

/// Virtual time that comfortably covers any debounce the engine uses.
pub const SETTLE_MS: u64 = 100;

/// Drives a [`TestPage`] through the steps a browser would take between
/// user actions and asserts on the markup contract.
pub struct PageTestRule {
    page: Rc<TestPage>,
    markup: MarkupContract,
}

impl PageTestRule {
    pub fn new(viewport_height: f64) -> Self {
        Self::with_page(TestPage::new(viewport_height))
    }

    pub fn with_page(page: TestPage) -> Self {
        Self {
            page: Rc::new(page),
            markup: MarkupContract::default(),
        }
    }

    pub fn with_markup(mut self, markup: MarkupContract) -> Self {
        self.markup = markup;
        self
    }

    pub fn page(&self) -> &Rc<TestPage> {
        &self.page
    }

    pub fn markup(&self) -> &MarkupContract {
        &self.markup
    }

    /// Lets observers, debounce timers and follow-up observers run.
    pub fn settle(&self) {
        self.page.flush_intersections();
        self.page.advance_time(SETTLE_MS);
        self.page.flush_intersections();
    }

    /// Scrolls so `element` sits in the middle of the viewport, then settles.
    pub fn scroll_into_view(&self, element: &TestElement) {
        use lumen_core::PageHost;
        let half = self.page.viewport_height() / 2.0;
        self.page.scroll_to((element.offset_top() - half).max(0.0));
        self.settle();
    }

    /// Lifecycle position of `element`, read back from its markup.
    pub fn state_of(&self, kind: MediaKind, element: &TestElement) -> ActivationState {
        if element.has_class(&self.markup.loaded_class) {
            ActivationState::Loaded
        } else if element
            .attribute(self.markup.marker(kind))
            .is_some_and(|value| !value.is_empty())
        {
            ActivationState::Pending
        } else {
            ActivationState::Activating
        }
    }

    pub fn assert_state(&self, kind: MediaKind, element: &TestElement, expected: ActivationState) {
        let actual = self.state_of(kind, element);
        assert_eq!(
            actual, expected,
            "{element:?} expected {expected:?} but was {actual:?}"
        );
    }

    pub fn assert_loaded(&self, element: &TestElement) {
        assert!(
            element.has_class(&self.markup.loaded_class),
            "{element:?} is missing class `{}` (has {:?})",
            self.markup.loaded_class,
            element.classes()
        );
    }

    pub fn assert_not_loaded(&self, element: &TestElement) {
        assert!(
            !element.has_class(&self.markup.loaded_class),
            "{element:?} unexpectedly carries class `{}`",
            self.markup.loaded_class
        );
    }

    /// Asserts the page holds no listeners, timers or observed targets.
    pub fn assert_idle(&self) {
        assert_eq!(self.page.viewport_listener_count(), 0, "viewport listeners");
        assert_eq!(self.page.pending_timer_count(), 0, "pending timers");
        assert_eq!(self.page.observed_target_count(), 0, "observed targets");
    }
}
