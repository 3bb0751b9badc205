//! Gallery carousel sync.
//!
//! Keeps the gallery carousel and its tab row pointing at one topic. Three
//! inputs drive the same state:
//!
//! - topic notifications from the bus ([`GallerySync::activate`])
//! - direct clicks on a gallery tab ([`GallerySync::click_tab`])
//! - the user swiping the carousel (the slide-change listener)
//!
//! Activating a slug moves the carousel to the first slide tagged with it and
//! marks the first tab tagged with it, clearing every other tab. A slug that
//! tags neither a slide nor a tab leaves everything as it was.
//!
//! A season change swaps the slides underneath the carousel, so the carousel
//! is rebuilt. The previously active tab is restored with the slide-change
//! listener detached, so the restore cannot be overwritten by a derived
//! "active slide" tab.

use crate::bus::TopicBus;
use crate::carousel::{Carousel, CarouselFactory, SlideChangeListener};
use crate::config::{CarouselConfig, Selectors};
use crate::dom::{Document, NodeId, Selector};
use crate::render::{GALLERY_ID_ATTR, TOPIC_TARGET_ATTR};
use crate::slug::Slug;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;

pub const CURRENT_TAB_CLASS: &str = "is-custom-current";

/// Topic a gallery tab or slide points at, normalized.
pub fn topic_tag(doc: &Document, node: NodeId) -> Option<Slug> {
    let raw = doc
        .attr(node, TOPIC_TARGET_ATTR)
        .or_else(|| doc.attr(node, GALLERY_ID_ATTR))?;
    Slug::new(raw)
}

struct Inner {
    doc: Rc<RefCell<Document>>,
    carousels: Rc<dyn CarouselFactory>,
    container: Selector,
    config: CarouselConfig,
    tab: Selector,
    tab_item: Selector,
    role_tab: Selector,
    carousel: RefCell<Option<Box<dyn Carousel>>>,
    current: RefCell<Option<Slug>>,
}

/// Cloneable handle; clones drive the same carousel.
#[derive(Clone)]
pub struct GallerySync {
    inner: Rc<Inner>,
}

impl GallerySync {
    /// Build the gallery carousel and mark the tab of its initial slide.
    pub fn mount(
        doc: Rc<RefCell<Document>>,
        carousels: Rc<dyn CarouselFactory>,
        selectors: &Selectors,
        config: &CarouselConfig,
    ) -> Self {
        let sync = Self {
            inner: Rc::new(Inner {
                doc,
                carousels,
                container: selectors.gallery_carousel.clone(),
                config: config.clone(),
                tab: selectors.gallery_tab.clone(),
                tab_item: selectors.gallery_tab_item.clone(),
                role_tab: Selector::attribute_equals("role", "tab"),
                carousel: RefCell::new(None),
                current: RefCell::new(None),
            }),
        };
        sync.build_carousel();
        sync.inner.follow_active_slide();
        sync.attach_listener();
        sync
    }

    /// React to every topic notification, manual or not.
    pub fn subscribe(&self, bus: &TopicBus) {
        let sync = self.clone();
        bus.subscribe("gallery", move |change| {
            sync.activate(change.topic.as_str());
        });
    }

    /// Point the carousel and tabs at `topic`. Returns whether anything
    /// matched it.
    pub fn activate(&self, topic: &str) -> bool {
        let Some(slug) = Slug::new(topic) else {
            return false;
        };
        let slide = self.inner.slide_index(&slug);
        let tab = self.inner.find_tab(&slug);
        if slide.is_none() && tab.is_none() {
            debug!(%slug, "no gallery slide or tab for topic");
            return false;
        }
        self.inner.mark_tab(tab);
        if let Some(index) = slide {
            self.inner.slide_to(index);
        }
        *self.inner.current.borrow_mut() = Some(slug);
        true
    }

    /// A user click on the gallery tab tagged `topic`.
    pub fn click_tab(&self, topic: &str) -> bool {
        self.activate(topic)
    }

    /// The active tab's topic: the marked tab in the page, else the last
    /// activated topic.
    pub fn current_tab(&self) -> Option<Slug> {
        let doc = self.inner.doc.borrow();
        doc.query_all(doc.root(), &self.inner.tab)
            .into_iter()
            .find(|&t| doc.has_class(t, CURRENT_TAB_CLASS))
            .and_then(|t| topic_tag(&doc, t))
            .or_else(|| self.inner.current.borrow().clone())
    }

    /// A user swipe on the carousel; the tabs catch up on the slide-change
    /// event.
    pub fn swipe(&self, forward: bool) {
        if let Some(carousel) = self.inner.carousel.borrow_mut().as_mut() {
            if forward {
                carousel.slide_next();
            } else {
                carousel.slide_prev();
            }
        }
    }

    pub fn carousel_index(&self) -> Option<usize> {
        self.inner.carousel.borrow().as_ref().map(|c| c.active_index())
    }

    /// Rebuild the carousel over freshly rendered slides and restore the tab
    /// that was active before.
    pub fn rebuild(&self) {
        let previous = self.current_tab();
        if let Some(carousel) = self.inner.carousel.borrow_mut().as_mut() {
            carousel.off_slide_change();
            carousel.destroy();
        }
        self.build_carousel();

        match previous {
            Some(slug) => {
                self.inner.mark_tab(self.inner.find_tab(&slug));
                if let Some(index) = self.inner.slide_index(&slug) {
                    self.inner.slide_to(index);
                }
                *self.inner.current.borrow_mut() = Some(slug);
            }
            None => self.inner.follow_active_slide(),
        }
        self.attach_listener();
    }

    fn build_carousel(&self) {
        let carousel = self
            .inner
            .carousels
            .create(&self.inner.container, &self.inner.config);
        if carousel.is_none() {
            debug!(selector = %self.inner.container, "gallery carousel missing");
        }
        *self.inner.carousel.borrow_mut() = carousel;
    }

    fn attach_listener(&self) {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let listener: SlideChangeListener = Rc::new(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.follow_active_slide();
            }
        });
        if let Some(carousel) = self.inner.carousel.borrow_mut().as_mut() {
            carousel.on_slide_change(listener);
        }
    }
}

impl Inner {
    fn slide_to(&self, index: usize) {
        if let Some(carousel) = self.carousel.borrow_mut().as_mut() {
            carousel.slide_to(index);
        }
    }

    fn slide_index(&self, slug: &Slug) -> Option<usize> {
        let carousel = self.carousel.borrow();
        let slides = carousel.as_ref()?.slides();
        let doc = self.doc.borrow();
        slides
            .iter()
            .position(|&slide| topic_tag(&doc, slide).as_ref() == Some(slug))
    }

    /// First tab tagged `slug`.
    fn find_tab(&self, slug: &Slug) -> Option<NodeId> {
        let doc = self.doc.borrow();
        doc.query_all(doc.root(), &self.tab)
            .into_iter()
            .find(|&t| topic_tag(&doc, t).as_ref() == Some(slug))
    }

    /// Mark `target` as the current tab and clear every other one.
    fn mark_tab(&self, target: Option<NodeId>) {
        let mut doc = self.doc.borrow_mut();
        let tabs = doc.query_all(doc.root(), &self.tab);
        for tab in tabs {
            let selected = Some(tab) == target;
            if selected {
                doc.add_class(tab, CURRENT_TAB_CLASS);
            } else {
                doc.remove_class(tab, CURRENT_TAB_CLASS);
            }
            let value = if selected { "true" } else { "false" };
            match doc
                .closest(tab, &self.role_tab)
                .or_else(|| doc.closest(tab, &self.tab_item))
            {
                Some(holder) if holder != tab => {
                    doc.set_attr(holder, "aria-selected", value);
                    doc.remove_attr(tab, "aria-selected");
                }
                _ => doc.set_attr(tab, "aria-selected", value),
            }
        }
    }

    /// Tabs follow whatever slide the carousel shows.
    fn follow_active_slide(&self) {
        let slug = {
            let carousel = self.carousel.borrow();
            let Some(carousel) = carousel.as_ref() else {
                return;
            };
            let Some(&slide) = carousel.slides().get(carousel.active_index()) else {
                return;
            };
            topic_tag(&self.doc.borrow(), slide)
        };
        if let Some(slug) = slug {
            self.mark_tab(self.find_tab(&slug));
            *self.current.borrow_mut() = Some(slug);
        }
    }
}
