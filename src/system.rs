//! Mounting the whole page.
//!
//! [`GallerySystem::mount`] wires every component to one document in a fixed
//! order, which is what makes the synchronous bus safe to rely on:
//!
//! 1. parse content once
//! 2. render topic list, gallery tabs and gallery slides
//! 3. mount and subscribe hero, quote, gallery sync and banner, in that order
//! 4. build the topic selector and the season controller
//! 5. perform the initial selection
//!
//! Step 5 only runs once everything that reacts to it exists, so the initial
//! notification reaches every widget exactly once.

use crate::banner::TopicBanner;
use crate::bus::{TopicBus, TopicChange};
use crate::carousel::{CarouselFactory, HeadlessCarouselFactory};
use crate::config::{Selectors, SiteConfig};
use crate::content::{ContentParser, Topic};
use crate::dom::{Document, Selector};
use crate::gallery::{CURRENT_TAB_CLASS, GallerySync, topic_tag};
use crate::hero::HeroImage;
use crate::image::{HeadlessLoader, ImageLoader};
use crate::quote::QuoteImage;
use crate::render::{GalleryImageRenderer, GalleryTabsRenderer, TOPIC_ATTR, TopicRenderer};
use crate::scheduler::Scheduler;
use crate::season::{SeasonController, SeasonTargets};
use crate::session::{Session, SharedSession};
use crate::slug::Slug;
use crate::topic_selector::{ACTIVE_CLASS, TopicSelector};
use crate::types::Season;
use crate::url_sync::{History, read_topic};
use serde::Serialize;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// The page's external collaborators.
pub struct Environment {
    pub scheduler: Scheduler,
    pub loader: Rc<dyn ImageLoader>,
    pub carousels: Rc<dyn CarouselFactory>,
}

/// Knobs for the headless environment.
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub viewport_width: u32,
    /// Image URLs whose loads fail.
    pub failing_images: Vec<String>,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            viewport_width: HeadlessCarouselFactory::DEFAULT_VIEWPORT_WIDTH,
            failing_images: Vec::new(),
        }
    }
}

impl Environment {
    /// Collaborators that run entirely on the virtual clock.
    pub fn headless(
        doc: &Rc<RefCell<Document>>,
        selectors: &Selectors,
        options: &HeadlessOptions,
    ) -> Self {
        let scheduler = Scheduler::new();
        let loader = HeadlessLoader::new(scheduler.clone());
        for url in &options.failing_images {
            loader.fail(url);
        }
        let carousels = HeadlessCarouselFactory::new(
            doc.clone(),
            scheduler.clone(),
            selectors.carousel_slide.clone(),
        )
        .with_viewport_width(options.viewport_width);
        Self {
            scheduler,
            loader: Rc::new(loader),
            carousels: Rc::new(carousels),
        }
    }
}

// ============================================================================
// Scripted user actions
// ============================================================================

#[derive(Error, Debug, PartialEq)]
pub enum ActionError {
    #[error("unknown action '{0}' (expected topic:<slug>, tab:<slug>, season[:<name>] or swipe:next|prev)")]
    Unknown(String),
    #[error("action '{0}' needs a value")]
    MissingValue(String),
    #[error("{0}")]
    Season(String),
}

/// One user interaction, as written on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `topic:<slug>` clicks a topic control.
    Topic(String),
    /// `tab:<slug>` clicks a gallery tab.
    Tab(String),
    /// `season` clicks the season switch.
    ToggleSeason,
    /// `season:<name>` sets the season directly.
    Season(Season),
    /// `swipe:next` or `swipe:prev` moves the gallery carousel.
    Swipe { forward: bool },
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = match s.split_once(':') {
            Some((kind, value)) => (kind.trim(), Some(value.trim())),
            None => (s.trim(), None),
        };
        let required = || {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ActionError::MissingValue(s.to_string()))
        };
        match kind {
            "topic" => Ok(Action::Topic(required()?.to_string())),
            "tab" => Ok(Action::Tab(required()?.to_string())),
            "season" => match value {
                None => Ok(Action::ToggleSeason),
                Some(name) => name.parse().map(Action::Season).map_err(ActionError::Season),
            },
            "swipe" => match required()? {
                "next" => Ok(Action::Swipe { forward: true }),
                "prev" => Ok(Action::Swipe { forward: false }),
                _ => Err(ActionError::Unknown(s.to_string())),
            },
            _ => Err(ActionError::Unknown(s.to_string())),
        }
    }
}

/// Observable page state after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub topic: Option<Slug>,
    pub season: Season,
    pub url: String,
    pub url_writes: usize,
    /// Every notification published so far, oldest first.
    pub notifications: Vec<TopicChange>,
    /// `data-topic` of every control marked active.
    pub active_controls: Vec<String>,
    pub topic_carousel: Option<usize>,
    pub gallery_carousel: Option<usize>,
    /// Topic of every gallery tab marked current.
    pub gallery_tabs: Vec<Slug>,
    pub gallery_slides: usize,
    pub hero_src: Option<String>,
    pub hero_transitioning: bool,
    pub quote_src: Option<String>,
    /// Banner text while the banner is visible.
    pub banner: Option<String>,
    pub season_switch: Option<String>,
}

pub struct GallerySystem {
    selectors: Selectors,
    doc: Rc<RefCell<Document>>,
    scheduler: Scheduler,
    session: SharedSession,
    bus: Rc<TopicBus>,
    history: Rc<RefCell<History>>,
    topics: Rc<[Topic]>,
    selector: TopicSelector,
    gallery: GallerySync,
    season: SeasonController,
    hero: Option<HeroImage>,
    quote: Option<QuoteImage>,
    banner: Option<TopicBanner>,
    journal: Rc<RefCell<Vec<TopicChange>>>,
}

impl GallerySystem {
    pub fn mount(
        doc: Rc<RefCell<Document>>,
        url: Url,
        env: Environment,
        config: &SiteConfig,
    ) -> Self {
        let selectors = &config.selectors;
        let season = config.default_season;
        let session = Session::shared(season);
        let bus = Rc::new(TopicBus::new());
        let history = Rc::new(RefCell::new(History::new(url)));

        let topics = ContentParser::new(doc.clone(), selectors).parse();
        {
            let mut page = doc.borrow_mut();
            TopicRenderer::render(&mut page, &topics, selectors);
            GalleryTabsRenderer::render(&mut page, &topics, selectors);
        }
        let slides = Rc::new(GalleryImageRenderer::new(
            doc.clone(),
            topics.clone(),
            selectors,
            season,
        ));
        slides.render();

        let hero = HeroImage::mount(
            doc.clone(),
            topics.clone(),
            env.loader.clone(),
            env.scheduler.clone(),
            selectors,
            &config.timing,
            season,
        );
        if let Some(hero) = &hero {
            hero.subscribe(&bus);
        }
        let quote = QuoteImage::mount(
            doc.clone(),
            topics.clone(),
            env.loader.clone(),
            selectors,
            season,
        );
        if let Some(quote) = &quote {
            quote.subscribe(&bus);
        }
        let gallery = GallerySync::mount(
            doc.clone(),
            env.carousels.clone(),
            selectors,
            &config.carousels.gallery,
        );
        gallery.subscribe(&bus);
        let banner = TopicBanner::mount(
            doc.clone(),
            env.scheduler.clone(),
            selectors,
            &config.timing,
        );
        if let Some(banner) = &banner {
            banner.subscribe(&bus);
        }
        let journal = Rc::new(RefCell::new(Vec::new()));
        {
            let journal = journal.clone();
            bus.subscribe("journal", move |change| {
                journal.borrow_mut().push(change.clone())
            });
        }

        let mut selector = TopicSelector::new(
            doc.clone(),
            session.clone(),
            bus.clone(),
            history.clone(),
            config,
            env.carousels.as_ref(),
        );
        let season_controller = SeasonController::new(
            doc.clone(),
            session.clone(),
            selectors,
            SeasonTargets {
                hero: hero.clone(),
                quote: quote.clone(),
                slides,
                gallery: gallery.clone(),
            },
        );

        let url_topic = read_topic(history.borrow().url(), &config.query_param);
        let initial = selector.select_initial(url_topic.as_deref());
        info!(
            topics = topics.len(),
            initial = initial.as_ref().map(Slug::as_str).unwrap_or("none"),
            "page mounted"
        );

        Self {
            selectors: selectors.clone(),
            doc,
            scheduler: env.scheduler,
            session,
            bus,
            history,
            topics,
            selector,
            gallery,
            season: season_controller,
            hero,
            quote,
            banner,
            journal,
        }
    }

    pub fn click_topic(&mut self, topic: &str) -> bool {
        self.selector.click(topic)
    }

    pub fn click_gallery_tab(&self, topic: &str) -> bool {
        self.gallery.click_tab(topic)
    }

    pub fn swipe_gallery(&self, forward: bool) {
        self.gallery.swipe(forward);
    }

    pub fn toggle_season(&self) -> Season {
        self.season.toggle()
    }

    pub fn set_season(&self, season: Season) -> bool {
        self.season.set_season(season)
    }

    /// Perform one action and let the page settle.
    pub fn apply(&mut self, action: &Action) {
        debug!(?action, "applying action");
        match action {
            Action::Topic(slug) => {
                self.click_topic(slug);
            }
            Action::Tab(slug) => {
                self.click_gallery_tab(slug);
            }
            Action::ToggleSeason => {
                self.toggle_season();
            }
            Action::Season(season) => {
                self.set_season(*season);
            }
            Action::Swipe { forward } => self.swipe_gallery(*forward),
        }
        self.run_until_idle();
    }

    /// Let every pending load, fade and timeout finish.
    pub fn run_until_idle(&self) -> usize {
        self.scheduler.run_until_idle()
    }

    pub fn advance(&self, duration: Duration) -> usize {
        self.scheduler.advance(duration)
    }

    pub fn bus(&self) -> &TopicBus {
        &self.bus
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.doc.borrow()
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn url(&self) -> Url {
        self.history.borrow().url().clone()
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        let (active_controls, gallery_tabs, gallery_slides) = {
            let doc = self.doc.borrow();
            let marked = |selector: &Selector, class: &str| {
                doc.query_all(doc.root(), selector)
                    .into_iter()
                    .filter(|&n| doc.has_class(n, class))
                    .collect::<Vec<_>>()
            };
            let active_controls: Vec<String> = marked(&self.selectors.topic_control, ACTIVE_CLASS)
                .into_iter()
                .filter_map(|n| doc.attr(n, TOPIC_ATTR).map(str::to_string))
                .collect();
            let gallery_tabs: Vec<Slug> = marked(&self.selectors.gallery_tab, CURRENT_TAB_CLASS)
                .into_iter()
                .filter_map(|n| topic_tag(&doc, n))
                .collect();
            let slides = doc.query_all(doc.root(), &self.selectors.gallery_slide).len();
            (active_controls, gallery_tabs, slides)
        };

        let session = self.session.borrow();
        let history = self.history.borrow();
        SystemSnapshot {
            topic: session.topic().cloned(),
            season: session.season(),
            url: history.url().to_string(),
            url_writes: history.replacements(),
            notifications: self.journal.borrow().clone(),
            active_controls,
            topic_carousel: self.selector.carousel_index(),
            gallery_carousel: self.gallery.carousel_index(),
            gallery_tabs,
            gallery_slides,
            hero_src: self.hero.as_ref().and_then(HeroImage::src),
            hero_transitioning: self.hero.as_ref().is_some_and(HeroImage::is_transitioning),
            quote_src: self.quote.as_ref().and_then(QuoteImage::src),
            banner: self
                .banner
                .as_ref()
                .filter(|b| b.is_visible())
                .map(|b| b.text().unwrap_or_default()),
            season_switch: self.season.switch_state(),
        }
    }
}
