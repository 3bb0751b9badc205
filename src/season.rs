//! Season controller.
//!
//! Flips the summer/winter axis and tells each season-aware widget directly.
//! Nothing goes through the topic bus: a season switch re-derives images for
//! the topic already selected, it does not select anything.

use crate::config::Selectors;
use crate::dom::{Document, NodeId};
use crate::gallery::GallerySync;
use crate::hero::HeroImage;
use crate::quote::QuoteImage;
use crate::render::GalleryImageRenderer;
use crate::session::SharedSession;
use crate::types::Season;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

/// Widgets that follow the season.
pub struct SeasonTargets {
    pub hero: Option<HeroImage>,
    pub quote: Option<QuoteImage>,
    pub slides: Rc<GalleryImageRenderer>,
    pub gallery: GallerySync,
}

pub struct SeasonController {
    doc: Rc<RefCell<Document>>,
    session: SharedSession,
    switch: Option<NodeId>,
    targets: SeasonTargets,
}

impl SeasonController {
    pub fn new(
        doc: Rc<RefCell<Document>>,
        session: SharedSession,
        selectors: &Selectors,
        targets: SeasonTargets,
    ) -> Self {
        let switch = {
            let doc = doc.borrow();
            doc.query(doc.root(), &selectors.season_switch)
                .and_then(|container| {
                    if doc.matches(container, &selectors.switch_control) {
                        Some(container)
                    } else {
                        doc.query(container, &selectors.switch_control)
                    }
                })
        };
        if switch.is_none() {
            debug!("no season switch on page");
        }
        let controller = Self {
            doc,
            session,
            switch,
            targets,
        };
        controller.reflect(controller.season());
        controller
    }

    pub fn season(&self) -> Season {
        self.session.borrow().season()
    }

    /// What a click on the switch does. Returns the new season.
    pub fn toggle(&self) -> Season {
        let season = self.season().toggled();
        self.set_season(season);
        season
    }

    /// Returns whether the season changed.
    pub fn set_season(&self, season: Season) -> bool {
        if self.season() == season {
            debug!(%season, "season unchanged");
            return false;
        }
        self.session.borrow_mut().set_season(season);
        self.reflect(season);
        info!(%season, "season switched");

        let topic = self.session.borrow().topic().cloned();
        let targets = &self.targets;
        if let Some(hero) = &targets.hero {
            hero.update_season(season, topic.as_ref());
        }
        targets.slides.update_season(season);
        if let Some(quote) = &targets.quote {
            quote.update_season(season, topic.as_ref());
        }
        targets.gallery.rebuild();
        true
    }

    /// `aria-checked="true"` means summer.
    fn reflect(&self, season: Season) {
        if let Some(switch) = self.switch {
            let checked = if season == Season::Summer { "true" } else { "false" };
            self.doc.borrow_mut().set_attr(switch, "aria-checked", checked);
        }
    }

    /// The switch's `aria-checked` value, if the page has a switch.
    pub fn switch_state(&self) -> Option<String> {
        let switch = self.switch?;
        self.doc
            .borrow()
            .attr(switch, "aria-checked")
            .map(str::to_string)
    }
}
