//! Selection state shared by every widget.
//!
//! One [`Session`] exists per mounted page, owned by the
//! [`GallerySystem`](crate::system::GallerySystem) and handed to components by
//! reference. Only the topic selector writes `topic` and only the season
//! controller writes `season`; everyone else reads.

use crate::slug::Slug;
use crate::types::Season;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

pub type SharedSession = Rc<RefCell<Session>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    topic: Option<Slug>,
    season: Season,
}

impl Session {
    pub fn new(season: Season) -> Self {
        Self {
            topic: None,
            season,
        }
    }

    pub fn shared(season: Season) -> SharedSession {
        Rc::new(RefCell::new(Self::new(season)))
    }

    /// The selected topic; `None` until the initial selection.
    pub fn topic(&self) -> Option<&Slug> {
        self.topic.as_ref()
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub(crate) fn set_topic(&mut self, topic: Slug) {
        self.topic = Some(topic);
    }

    pub(crate) fn set_season(&mut self, season: Season) {
        self.season = season;
    }
}
