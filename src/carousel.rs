//! Carousel widget seam.
//!
//! The slider itself is an external collaborator. Widgets in this crate only
//! need to move it, read its position and hear about position changes, which
//! is what [`Carousel`] exposes. [`HeadlessCarousel`] implements it on top of
//! the page [`Document`], marking the active slide with
//! [`ACTIVE_SLIDE_CLASS`] the way the real widget does.
//!
//! Slide-change events are delivered on a later scheduler turn, and only to
//! the listener attached at the moment the slide moved. A listener detached
//! before a move never hears about it.

use crate::config::CarouselConfig;
use crate::dom::{Document, NodeId, Selector};
use crate::scheduler::Scheduler;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

pub const ACTIVE_SLIDE_CLASS: &str = "swiper-slide-active";

pub type SlideChangeListener = Rc<dyn Fn(usize)>;

pub trait Carousel {
    /// Move to `index` (clamped to the last slide). No event if unchanged.
    fn slide_to(&mut self, index: usize);
    fn slide_next(&mut self);
    fn slide_prev(&mut self);
    fn active_index(&self) -> usize;
    /// Slides captured when the carousel was built.
    fn slides(&self) -> &[NodeId];
    fn on_slide_change(&mut self, listener: SlideChangeListener);
    fn off_slide_change(&mut self);
    /// Tear down; later calls are no-ops.
    fn destroy(&mut self);
}

pub trait CarouselFactory {
    /// Build a carousel on the first element matching `container`, or `None`
    /// if the page has no such element.
    fn create(&self, container: &Selector, config: &CarouselConfig) -> Option<Box<dyn Carousel>>;
}

pub struct HeadlessCarousel {
    doc: Rc<RefCell<Document>>,
    scheduler: Scheduler,
    config: CarouselConfig,
    slides: Vec<NodeId>,
    active: usize,
    listener: Option<SlideChangeListener>,
    destroyed: bool,
}

impl HeadlessCarousel {
    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    fn mark_active(&self) {
        let mut doc = self.doc.borrow_mut();
        for (idx, &slide) in self.slides.iter().enumerate() {
            if idx == self.active && !self.destroyed {
                doc.add_class(slide, ACTIVE_SLIDE_CLASS);
            } else {
                doc.remove_class(slide, ACTIVE_SLIDE_CLASS);
            }
        }
    }
}

impl Carousel for HeadlessCarousel {
    fn slide_to(&mut self, index: usize) {
        if self.destroyed || self.slides.is_empty() {
            return;
        }
        let index = index.min(self.slides.len() - 1);
        if index == self.active {
            return;
        }
        self.active = index;
        self.mark_active();
        if let Some(listener) = self.listener.clone() {
            self.scheduler.defer(move || listener(index));
        }
    }

    fn slide_next(&mut self) {
        let last = self.slides.len().saturating_sub(1);
        let next = match self.active {
            i if i < last => i + 1,
            _ if self.config.rewind => 0,
            i => i,
        };
        self.slide_to(next);
    }

    fn slide_prev(&mut self) {
        let last = self.slides.len().saturating_sub(1);
        let prev = match self.active {
            0 if self.config.rewind => last,
            0 => 0,
            i => i - 1,
        };
        self.slide_to(prev);
    }

    fn active_index(&self) -> usize {
        self.active
    }

    fn slides(&self) -> &[NodeId] {
        &self.slides
    }

    fn on_slide_change(&mut self, listener: SlideChangeListener) {
        if !self.destroyed {
            self.listener = Some(listener);
        }
    }

    fn off_slide_change(&mut self) {
        self.listener = None;
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.listener = None;
        self.destroyed = true;
        self.mark_active();
    }
}

/// Builds [`HeadlessCarousel`]s for one page at a fixed viewport width.
pub struct HeadlessCarouselFactory {
    doc: Rc<RefCell<Document>>,
    scheduler: Scheduler,
    slide: Selector,
    viewport_width: u32,
    built: RefCell<Vec<(String, CarouselConfig)>>,
}

impl HeadlessCarouselFactory {
    pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

    pub fn new(doc: Rc<RefCell<Document>>, scheduler: Scheduler, slide: Selector) -> Self {
        Self {
            doc,
            scheduler,
            slide,
            viewport_width: Self::DEFAULT_VIEWPORT_WIDTH,
            built: RefCell::new(Vec::new()),
        }
    }

    pub fn with_viewport_width(mut self, width: u32) -> Self {
        self.viewport_width = width;
        self
    }

    /// Every carousel built so far: container selector and resolved config.
    pub fn built(&self) -> Vec<(String, CarouselConfig)> {
        self.built.borrow().clone()
    }
}

impl CarouselFactory for HeadlessCarouselFactory {
    fn create(&self, container: &Selector, config: &CarouselConfig) -> Option<Box<dyn Carousel>> {
        let slides = {
            let doc = self.doc.borrow();
            let Some(root) = doc.query(doc.root(), container) else {
                debug!(%container, "carousel container missing");
                return None;
            };
            doc.query_all(root, &self.slide)
        };
        let config = config.resolve(self.viewport_width);
        let active = config.initial_slide.min(slides.len().saturating_sub(1));
        self.built
            .borrow_mut()
            .push((container.to_string(), config.clone()));

        let carousel = HeadlessCarousel {
            doc: self.doc.clone(),
            scheduler: self.scheduler.clone(),
            config,
            slides,
            active,
            listener: None,
            destroyed: false,
        };
        carousel.mark_active();
        Some(Box::new(carousel))
    }
}
