//! Topic banner: a transient "now showing" strip for manual selections.
//!
//! The entrance and exit animation belongs to the page's animation library;
//! this module only decides when the banner is on screen and what it says.
//! A newer banner cancels the pending hide of an older one.

use crate::bus::{TopicBus, TopicChange};
use crate::config::{Selectors, TimingConfig};
use crate::dom::{Document, NodeId};
use crate::scheduler::Scheduler;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

struct Inner {
    doc: Rc<RefCell<Document>>,
    banner: NodeId,
    text: Option<NodeId>,
    scheduler: Scheduler,
    hold: Duration,
    generation: Cell<u64>,
}

#[derive(Clone)]
pub struct TopicBanner {
    inner: Rc<Inner>,
}

impl TopicBanner {
    pub fn mount(
        doc: Rc<RefCell<Document>>,
        scheduler: Scheduler,
        selectors: &Selectors,
        timing: &TimingConfig,
    ) -> Option<Self> {
        let (banner, text) = {
            let doc = doc.borrow();
            let banner = doc.query(doc.root(), &selectors.banner);
            (banner, doc.query(doc.root(), &selectors.banner_text))
        };
        let Some(banner) = banner else {
            debug!(selector = %selectors.banner, "no topic banner on page");
            return None;
        };
        Some(Self {
            inner: Rc::new(Inner {
                doc,
                banner,
                text,
                scheduler,
                hold: timing.banner_hold(),
                generation: Cell::new(0),
            }),
        })
    }

    pub fn subscribe(&self, bus: &TopicBus) {
        let banner = self.clone();
        bus.subscribe("banner", move |change| banner.on_topic(change));
    }

    pub fn on_topic(&self, change: &TopicChange) {
        if !change.manual {
            return;
        }
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        {
            let mut doc = self.inner.doc.borrow_mut();
            if let Some(text) = self.inner.text {
                doc.set_text(text, change.topic.as_str());
            }
            doc.set_style(self.inner.banner, "display", "block");
            doc.set_style(self.inner.banner, "opacity", "1");
        }

        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.after(self.inner.hold, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.generation.get() != generation {
                return;
            }
            let mut doc = inner.doc.borrow_mut();
            doc.set_style(inner.banner, "opacity", "0");
            doc.set_style(inner.banner, "display", "none");
        });
    }

    pub fn is_visible(&self) -> bool {
        self.inner.doc.borrow().style(self.inner.banner, "display") == Some("block")
    }

    /// The banner's current text, if it has a text element.
    pub fn text(&self) -> Option<String> {
        let text = self.inner.text?;
        Some(self.inner.doc.borrow().text(text))
    }
}
