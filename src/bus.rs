//! Typed in-process topic notification bus.
//!
//! Replaces a document-level `"topicChange"` custom event: the payload shape
//! is a Rust type and subscribers are registered explicitly, so ordering is a
//! property of construction order rather than of string-keyed listeners.
//!
//! Dispatch is synchronous. Every subscriber sees a publication, in
//! registration order, before [`TopicBus::publish`] returns. Subscribers
//! registered during a dispatch only see later publications.

use crate::slug::Slug;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::trace;

/// "The selected topic is now `topic`."
///
/// `manual` distinguishes a user's click from the programmatic initial
/// selection, so presentation-only effects can skip the latter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicChange {
    pub topic: Slug,
    pub manual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Rc<dyn Fn(&TopicChange)>;

struct Subscriber {
    id: SubscriptionId,
    name: &'static str,
    handler: Handler,
}

#[derive(Default)]
pub struct TopicBus {
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
    published: Cell<usize>,
}

impl TopicBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        name: &'static str,
        handler: impl Fn(&TopicChange) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            name,
            handler: Rc::new(handler),
        });
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn publish(&self, change: &TopicChange) {
        // Snapshot so handlers may subscribe or unsubscribe while we dispatch.
        let snapshot: Vec<(&'static str, Handler)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|s| (s.name, s.handler.clone()))
            .collect();
        self.published.set(self.published.get() + 1);
        for (name, handler) in snapshot {
            trace!(subscriber = name, topic = %change.topic, manual = change.manual, "dispatch");
            handler(change);
        }
    }

    /// Names of current subscribers, in dispatch order.
    pub fn subscriber_names(&self) -> Vec<&'static str> {
        self.subscribers.borrow().iter().map(|s| s.name).collect()
    }

    /// Total publications so far.
    pub fn published(&self) -> usize {
        self.published.get()
    }
}
