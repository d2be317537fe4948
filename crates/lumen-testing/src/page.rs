//! In-memory [`PageHost`] with scriptable geometry and a virtual clock.
//!
//! Nothing happens on its own: tests drive scrolling, timer expiry,
//! intersection delivery and load completion explicitly, which makes the
//! interleaving of callbacks deterministic.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use lumen_core::collections::map::HashMap;
use lumen_core::{
    IntersectionCallback, IntersectionEntry, IntersectionObserverHandle, LazyLoadError,
    MediaElement, ObserverOptions, PageHost, Subscription, ViewportEvent,
};

use crate::selector::{Matchable, Selector};

pub type NodeId = u64;

/// Default element height used when a test does not set one.
pub const DEFAULT_ELEMENT_HEIGHT: f64 = 100.0;

#[derive(Debug)]
struct NodeData {
    tag: String,
    attrs: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    offset_top: f64,
    height: f64,
    complete: bool,
    reloads: u32,
}

impl NodeData {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            parent,
            children: Vec::new(),
            offset_top: 0.0,
            height: DEFAULT_ELEMENT_HEIGHT,
            complete: false,
            reloads: 0,
        }
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attrs
            .get("class")
            .map(String::as_str)
            .unwrap_or("")
            .split_whitespace()
    }
}

impl Matchable for NodeData {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

struct PendingTimer {
    id: u64,
    due: u64,
    callback: Box<dyn FnOnce()>,
}

struct ObserverRecord {
    id: u64,
    margin_px: f64,
    callback: IntersectionCallback<TestElement>,
    /// Observed targets and the state last reported for each.
    targets: Vec<(NodeId, Option<bool>)>,
}

struct DomTree {
    nodes: HashMap<NodeId, NodeData>,
    body: NodeId,
    next_node: NodeId,
    next_registration: u64,

    scroll_offset: f64,
    viewport_height: f64,
    intersection_observer: bool,

    now_ms: u64,
    timers: Vec<PendingTimer>,
    viewport_listeners: Vec<(u64, ViewportEvent, Rc<dyn Fn()>)>,
    window_listeners: Vec<(u64, String, Rc<dyn Fn()>)>,
    element_listeners: Vec<(NodeId, String, Box<dyn FnOnce()>)>,
    observers: Vec<ObserverRecord>,
}

impl DomTree {
    fn new(viewport_height: f64) -> Self {
        let body = 1;
        let mut nodes = HashMap::default();
        nodes.insert(body, NodeData::new("body", None));
        Self {
            nodes,
            body,
            next_node: body + 1,
            next_registration: 1,
            scroll_offset: 0.0,
            viewport_height,
            intersection_observer: true,
            now_ms: 0,
            timers: Vec::new(),
            viewport_listeners: Vec::new(),
            window_listeners: Vec::new(),
            element_listeners: Vec::new(),
            observers: Vec::new(),
        }
    }

    fn registration(&mut self) -> u64 {
        let id = self.next_registration;
        self.next_registration += 1;
        id
    }

    fn insert(&mut self, tag: &str, parent: NodeId) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(id, NodeData::new(tag, Some(parent)));
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.push(id);
        }
        id
    }

    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &NodeData> {
        let mut next = self.nodes.get(&id).and_then(|node| node.parent);
        std::iter::from_fn(move || {
            let node = self.nodes.get(&next?)?;
            next = node.parent;
            Some(node)
        })
    }

    fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|node| selector.matches(node, self.ancestors(id)))
    }

    /// Descendants of `root` in document order, excluding `root` itself.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .nodes
            .get(&root)
            .map(|node| node.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn is_intersecting(&self, id: NodeId, margin_px: f64) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        let top_edge = self.scroll_offset - margin_px;
        let bottom_edge = self.scroll_offset + self.viewport_height + margin_px;
        node.offset_top <= bottom_edge && node.offset_top + node.height >= top_edge
    }
}

fn parse_margin_px(root_margin: &str) -> f64 {
    root_margin
        .split_whitespace()
        .next()
        .and_then(|token| token.strip_suffix("px"))
        .and_then(|value| value.parse().ok())
        .unwrap_or(0.0)
}

/// Handle to a node in a [`TestPage`]. Equality is node identity.
#[derive(Clone)]
pub struct TestElement {
    id: NodeId,
    dom: Weak<RefCell<DomTree>>,
}

impl PartialEq for TestElement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.dom, &other.dom)
    }
}

impl fmt::Debug for TestElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.read(|node| node.tag.clone()).unwrap_or_default();
        write!(f, "TestElement(#{} <{}>)", self.id, tag)
    }
}

impl TestElement {
    fn read<R>(&self, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        let dom = self.dom.upgrade()?;
        let dom = dom.borrow();
        dom.nodes.get(&self.id).map(f)
    }

    fn write(&self, f: impl FnOnce(&mut NodeData)) {
        if let Some(dom) = self.dom.upgrade() {
            if let Some(node) = dom.borrow_mut().nodes.get_mut(&self.id) {
                f(node);
            }
        }
    }

    fn handle(&self, id: NodeId) -> Self {
        Self {
            id,
            dom: self.dom.clone(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn children(&self) -> Vec<TestElement> {
        self.read(|node| node.children.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|id| self.handle(id))
            .collect()
    }

    pub fn classes(&self) -> Vec<String> {
        self.read(|node| node.classes().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Number of times [`MediaElement::reload`] was called.
    pub fn reload_count(&self) -> u32 {
        self.read(|node| node.reloads).unwrap_or(0)
    }

    pub fn set_offset_top(&self, offset_top: f64) {
        self.write(|node| node.offset_top = offset_top);
    }

    pub fn set_complete(&self, complete: bool) {
        self.write(|node| node.complete = complete);
    }
}

impl MediaElement for TestElement {
    fn tag_name(&self) -> String {
        self.read(|node| node.tag.clone()).unwrap_or_default()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.read(|node| node.attrs.get(name).cloned()).flatten()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.write(|node| {
            node.attrs.insert(name.to_string(), value.to_string());
        });
    }

    fn remove_attribute(&self, name: &str) {
        self.write(|node| {
            node.attrs.remove(name);
        });
    }

    fn has_class(&self, class: &str) -> bool {
        self.read(|node| node.has_class(class)).unwrap_or(false)
    }

    fn add_class(&self, class: &str) {
        self.write(|node| {
            if node.has_class(class) {
                return;
            }
            let mut list = node.attrs.remove("class").unwrap_or_default();
            if !list.is_empty() {
                list.push(' ');
            }
            list.push_str(class);
            node.attrs.insert("class".into(), list);
        });
    }

    fn closest(&self, selector: &str) -> Option<Self> {
        let selector = Selector::parse(selector)?;
        let dom = self.dom.upgrade()?;
        let dom = dom.borrow();
        let mut current = Some(self.id);
        while let Some(id) = current {
            if dom.matches(id, &selector) {
                return Some(self.handle(id));
            }
            current = dom.nodes.get(&id).and_then(|node| node.parent);
        }
        None
    }

    fn query_descendant(&self, selector: &str) -> Option<Self> {
        let selector = Selector::parse(selector)?;
        let dom = self.dom.upgrade()?;
        let dom = dom.borrow();
        dom.descendants(self.id)
            .into_iter()
            .find(|id| dom.matches(*id, &selector))
            .map(|id| self.handle(id))
    }

    fn append_source(&self, src: &str, mime: &str) {
        let Some(dom) = self.dom.upgrade() else {
            return;
        };
        let mut dom = dom.borrow_mut();
        let offset_top = dom.nodes.get(&self.id).map(|n| n.offset_top).unwrap_or(0.0);
        let child = dom.insert("source", self.id);
        if let Some(node) = dom.nodes.get_mut(&child) {
            node.attrs.insert("src".into(), src.into());
            node.attrs.insert("type".into(), mime.into());
            node.offset_top = offset_top;
            node.height = 0.0;
        }
    }

    fn reload(&self) {
        self.write(|node| node.reloads += 1);
    }

    fn offset_top(&self) -> f64 {
        self.read(|node| node.offset_top).unwrap_or(0.0)
    }

    fn is_complete(&self) -> bool {
        self.read(|node| node.complete).unwrap_or(false)
    }

    fn once(&self, event: &str, callback: Box<dyn FnOnce()>) {
        if let Some(dom) = self.dom.upgrade() {
            dom.borrow_mut()
                .element_listeners
                .push((self.id, event.to_string(), callback));
        }
    }
}

/// Builder for elements added to a [`TestPage`].
pub struct ElementBuilder<'a> {
    page: &'a TestPage,
    tag: String,
    parent: Option<NodeId>,
    attrs: Vec<(String, String)>,
    offset_top: f64,
    height: f64,
    complete: bool,
}

impl<'a> ElementBuilder<'a> {
    pub fn inside(mut self, parent: &TestElement) -> Self {
        self.parent = Some(parent.id);
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        match self.attrs.iter_mut().find(|(name, _)| name == "class") {
            Some((_, list)) => {
                list.push(' ');
                list.push_str(class);
            }
            None => self.attrs.push(("class".into(), class.into())),
        }
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn offset_top(mut self, offset_top: f64) -> Self {
        self.offset_top = offset_top;
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    /// Marks the resource as already loaded (cached or eagerly fetched).
    pub fn complete(mut self) -> Self {
        self.complete = true;
        self
    }

    pub fn build(self) -> TestElement {
        let mut dom = self.page.dom.borrow_mut();
        let parent = self.parent.unwrap_or(dom.body);
        let id = dom.insert(&self.tag, parent);
        if let Some(node) = dom.nodes.get_mut(&id) {
            node.attrs.extend(self.attrs);
            node.offset_top = self.offset_top;
            node.height = self.height;
            node.complete = self.complete;
        }
        TestElement {
            id,
            dom: Rc::downgrade(&self.page.dom),
        }
    }
}

/// Scriptable page used by engine tests.
pub struct TestPage {
    dom: Rc<RefCell<DomTree>>,
}

impl TestPage {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            dom: Rc::new(RefCell::new(DomTree::new(viewport_height))),
        }
    }

    /// A page that reports no native intersection observer.
    pub fn without_intersection_observer(self) -> Self {
        self.dom.borrow_mut().intersection_observer = false;
        self
    }

    pub fn body(&self) -> TestElement {
        self.element_handle(self.dom.borrow().body)
    }

    /// Starts building a `<tag>` element appended to the body.
    pub fn create(&self, tag: &str) -> ElementBuilder<'_> {
        ElementBuilder {
            page: self,
            tag: tag.into(),
            parent: None,
            attrs: Vec::new(),
            offset_top: 0.0,
            height: DEFAULT_ELEMENT_HEIGHT,
            complete: false,
        }
    }

    fn element_handle(&self, id: NodeId) -> TestElement {
        TestElement {
            id,
            dom: Rc::downgrade(&self.dom),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.dom.borrow().now_ms
    }

    pub fn set_scroll_offset(&self, offset: f64) {
        self.dom.borrow_mut().scroll_offset = offset;
    }

    /// Moves the viewport and dispatches a scroll event.
    pub fn scroll_to(&self, offset: f64) {
        self.set_scroll_offset(offset);
        self.dispatch_viewport(ViewportEvent::Scroll);
    }

    /// Changes the viewport height and dispatches a resize event.
    pub fn resize_viewport(&self, height: f64) {
        self.dom.borrow_mut().viewport_height = height;
        self.dispatch_viewport(ViewportEvent::Resize);
    }

    pub fn dispatch_viewport(&self, event: ViewportEvent) {
        let callbacks: Vec<_> = self
            .dom
            .borrow()
            .viewport_listeners
            .iter()
            .filter(|(_, kind, _)| *kind == event)
            .map(|(_, _, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    pub fn dispatch_window_event(&self, name: &str) {
        let callbacks: Vec<_> = self
            .dom
            .borrow()
            .window_listeners
            .iter()
            .filter(|(_, event, _)| event == name)
            .map(|(_, _, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Fires and consumes the one-time listeners for `event` on `element`.
    ///
    /// An `error` consumes every listener on the element but runs only those
    /// registered for `error`.
    pub fn dispatch_element_event(&self, element: &TestElement, event: &str) {
        let released = event == "error";
        let fired: Vec<_> = {
            let mut dom = self.dom.borrow_mut();
            let (fired, kept) = std::mem::take(&mut dom.element_listeners)
                .into_iter()
                .partition(|(id, name, _)| *id == element.id && (released || name == event));
            dom.element_listeners = kept;
            fired
        };
        for (_, name, callback) in fired {
            if name == event {
                callback();
            }
        }
    }

    /// Simulates the network finishing `element`'s resource.
    pub fn finish_loading(&self, element: &TestElement) {
        element.set_complete(true);
        self.dispatch_element_event(element, "load");
        self.dispatch_element_event(element, "loadeddata");
    }

    /// Simulates `element`'s resource failing to load.
    pub fn fail_loading(&self, element: &TestElement) {
        self.dispatch_element_event(element, "error");
    }

    /// Advances the virtual clock, firing due timers in deadline order.
    ///
    /// Timers scheduled by a firing timer also run if they fall due within
    /// the window.
    pub fn advance_time(&self, ms: u64) {
        let target = self.dom.borrow().now_ms + ms;
        loop {
            let next = {
                let mut dom = self.dom.borrow_mut();
                let due = dom
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by_key(|(_, timer)| (timer.due, timer.id))
                    .map(|(index, _)| index);
                due.map(|index| {
                    let timer = dom.timers.remove(index);
                    dom.now_ms = timer.due;
                    timer.callback
                })
            };
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
        self.dom.borrow_mut().now_ms = target;
    }

    /// Delivers pending intersection changes to every connected observer.
    ///
    /// First observation of a target always reports its current state.
    pub fn flush_intersections(&self) {
        let observer_ids: Vec<u64> = self.dom.borrow().observers.iter().map(|o| o.id).collect();
        for observer_id in observer_ids {
            let delivery = {
                let mut dom = self.dom.borrow_mut();
                let dom = &mut *dom;
                let Some(index) = dom.observers.iter().position(|o| o.id == observer_id) else {
                    continue;
                };
                let margin = dom.observers[index].margin_px;
                let states: Vec<bool> = dom.observers[index]
                    .targets
                    .iter()
                    .map(|(id, _)| dom.is_intersecting(*id, margin))
                    .collect();
                let record = &mut dom.observers[index];
                let mut entries = Vec::new();
                for ((id, last), now) in record.targets.iter_mut().zip(states) {
                    if *last != Some(now) {
                        *last = Some(now);
                        entries.push(IntersectionEntry {
                            target: TestElement {
                                id: *id,
                                dom: Rc::downgrade(&self.dom),
                            },
                            is_intersecting: now,
                        });
                    }
                }
                (record.callback.clone(), entries)
            };
            let (callback, entries) = delivery;
            if !entries.is_empty() {
                callback(entries);
            }
        }
    }

    pub fn viewport_listener_count(&self) -> usize {
        self.dom.borrow().viewport_listeners.len()
    }

    pub fn window_listener_count(&self) -> usize {
        self.dom.borrow().window_listeners.len()
    }

    pub fn pending_timer_count(&self) -> usize {
        self.dom.borrow().timers.len()
    }

    pub fn observer_count(&self) -> usize {
        self.dom.borrow().observers.len()
    }

    /// Targets currently observed across all observers.
    pub fn observed_target_count(&self) -> usize {
        self.dom.borrow().observers.iter().map(|o| o.targets.len()).sum()
    }

    pub fn pending_element_listener_count(&self, element: &TestElement) -> usize {
        self.dom
            .borrow()
            .element_listeners
            .iter()
            .filter(|(id, _, _)| *id == element.id)
            .count()
    }
}

struct TestObserver {
    id: u64,
    dom: Weak<RefCell<DomTree>>,
}

impl TestObserver {
    fn with_record(&self, f: impl FnOnce(&mut ObserverRecord)) {
        if let Some(dom) = self.dom.upgrade() {
            if let Some(record) = dom.borrow_mut().observers.iter_mut().find(|o| o.id == self.id) {
                f(record);
            }
        }
    }
}

impl IntersectionObserverHandle<TestElement> for TestObserver {
    fn observe(&self, target: &TestElement) {
        self.with_record(|record| {
            if !record.targets.iter().any(|(id, _)| *id == target.id) {
                record.targets.push((target.id, None));
            }
        });
    }

    fn unobserve(&self, target: &TestElement) {
        self.with_record(|record| record.targets.retain(|(id, _)| *id != target.id));
    }

    fn disconnect(&self) {
        if let Some(dom) = self.dom.upgrade() {
            dom.borrow_mut().observers.retain(|o| o.id != self.id);
        }
    }
}

impl PageHost for TestPage {
    type Element = TestElement;

    fn query_all(&self, selector: &str) -> Vec<TestElement> {
        let Some(selector) = Selector::parse(selector) else {
            log::warn!("unsupported selector in test page: {selector}");
            return Vec::new();
        };
        let dom = self.dom.borrow();
        dom.descendants(dom.body)
            .into_iter()
            .filter(|id| dom.matches(*id, &selector))
            .map(|id| self.element_handle(id))
            .collect()
    }

    fn scroll_offset(&self) -> f64 {
        self.dom.borrow().scroll_offset
    }

    fn viewport_height(&self) -> f64 {
        self.dom.borrow().viewport_height
    }

    fn supports_intersection_observer(&self) -> bool {
        self.dom.borrow().intersection_observer
    }

    fn observe_intersections(
        &self,
        options: &ObserverOptions,
        callback: IntersectionCallback<TestElement>,
    ) -> Result<Rc<dyn IntersectionObserverHandle<TestElement>>, LazyLoadError> {
        let mut dom = self.dom.borrow_mut();
        if !dom.intersection_observer {
            return Err(LazyLoadError::Unsupported("IntersectionObserver"));
        }
        let id = dom.registration();
        dom.observers.push(ObserverRecord {
            id,
            margin_px: parse_margin_px(&options.root_margin),
            callback,
            targets: Vec::new(),
        });
        Ok(Rc::new(TestObserver {
            id,
            dom: Rc::downgrade(&self.dom),
        }))
    }

    fn listen_viewport(&self, event: ViewportEvent, callback: Rc<dyn Fn()>) -> Subscription {
        let id = {
            let mut dom = self.dom.borrow_mut();
            let id = dom.registration();
            dom.viewport_listeners.push((id, event, callback));
            id
        };
        let dom = Rc::downgrade(&self.dom);
        Subscription::on_drop(move || {
            if let Some(dom) = dom.upgrade() {
                dom.borrow_mut().viewport_listeners.retain(|(other, _, _)| *other != id);
            }
        })
    }

    fn listen_window(&self, event: &str, callback: Rc<dyn Fn()>) -> Subscription {
        let id = {
            let mut dom = self.dom.borrow_mut();
            let id = dom.registration();
            dom.window_listeners.push((id, event.to_string(), callback));
            id
        };
        let dom = Rc::downgrade(&self.dom);
        Subscription::on_drop(move || {
            if let Some(dom) = dom.upgrade() {
                dom.borrow_mut().window_listeners.retain(|(other, _, _)| *other != id);
            }
        })
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> Subscription {
        let id = {
            let mut dom = self.dom.borrow_mut();
            let id = dom.registration();
            let due = dom.now_ms + u64::from(delay_ms);
            dom.timers.push(PendingTimer { id, due, callback });
            id
        };
        let dom = Rc::downgrade(&self.dom);
        Subscription::on_drop(move || {
            if let Some(dom) = dom.upgrade() {
                dom.borrow_mut().timers.retain(|timer| timer.id != id);
            }
        })
    }
}
