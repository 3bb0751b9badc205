//! Hero image swap.
//!
//! Shows the selected topic's hero image for the current season. Images are
//! preloaded off-page; the visible `src` only changes once the new image has
//! loaded, and a failed load leaves the previous image in place.
//!
//! A manual selection fades: opacity drops to 0, and after the configured
//! fade delay the image is swapped, the `scaleup` animation class restarted
//! and opacity restored. The initial (non-manual) selection swaps at once.
//!
//! While a swap is in flight further requests are dropped, not queued. The
//! guard is released when the swap task runs or the load fails.

use crate::bus::{TopicBus, TopicChange};
use crate::config::{Selectors, TimingConfig};
use crate::content::Topic;
use crate::dom::{Document, NodeId};
use crate::image::{ImageCache, ImageLoader, SeasonImageMap};
use crate::scheduler::Scheduler;
use crate::slug::Slug;
use crate::types::Season;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

pub const SCALEUP_CLASS: &str = "scaleup";

struct State {
    season: Season,
    map: SeasonImageMap,
    topic: Option<Slug>,
    transitioning: bool,
    cache: ImageCache,
}

struct Inner {
    doc: Rc<RefCell<Document>>,
    img: NodeId,
    topics: Rc<[Topic]>,
    loader: Rc<dyn ImageLoader>,
    scheduler: Scheduler,
    fade: Duration,
    state: RefCell<State>,
}

#[derive(Clone)]
pub struct HeroImage {
    inner: Rc<Inner>,
}

fn season_map(topics: &[Topic], season: Season) -> SeasonImageMap {
    SeasonImageMap::build(topics, |t| t.hero_image(season))
}

impl HeroImage {
    /// `None` when the page has no hero image.
    pub fn mount(
        doc: Rc<RefCell<Document>>,
        topics: Rc<[Topic]>,
        loader: Rc<dyn ImageLoader>,
        scheduler: Scheduler,
        selectors: &Selectors,
        timing: &TimingConfig,
        season: Season,
    ) -> Option<Self> {
        let img = {
            let doc = doc.borrow();
            doc.query(doc.root(), &selectors.hero_image)
        };
        let Some(img) = img else {
            debug!(selector = %selectors.hero_image, "no hero image, hero swap disabled");
            return None;
        };
        let map = season_map(&topics, season);
        let hero = Self {
            inner: Rc::new(Inner {
                doc,
                img,
                topics,
                loader,
                scheduler,
                fade: timing.hero_fade(),
                state: RefCell::new(State {
                    season,
                    map,
                    topic: None,
                    transitioning: false,
                    cache: ImageCache::default(),
                }),
            }),
        };
        hero.preload();
        hero.inner.show();
        Some(hero)
    }

    pub fn subscribe(&self, bus: &TopicBus) {
        let hero = self.clone();
        bus.subscribe("hero", move |change| hero.on_topic(change));
    }

    pub fn on_topic(&self, change: &TopicChange) {
        self.inner.state.borrow_mut().topic = Some(change.topic.clone());
        load(&self.inner, &change.topic, change.manual);
    }

    /// Switch to `season`'s images and show the current topic's one.
    pub fn update_season(&self, season: Season, topic: Option<&Slug>) {
        let topic = {
            let mut state = self.inner.state.borrow_mut();
            state.season = season;
            state.map = season_map(&self.inner.topics, season);
            if let Some(topic) = topic {
                state.topic = Some(topic.clone());
            }
            state.topic.clone()
        };
        self.preload();
        if let Some(topic) = topic {
            load(&self.inner, &topic, true);
        }
    }

    pub fn season(&self) -> Season {
        self.inner.state.borrow().season
    }

    pub fn is_transitioning(&self) -> bool {
        self.inner.state.borrow().transitioning
    }

    /// The visible `src`.
    pub fn src(&self) -> Option<String> {
        self.inner.src()
    }

    /// Number of hero images loaded so far.
    pub fn cached(&self) -> usize {
        self.inner.state.borrow().cache.len()
    }

    /// Warm the cache with every image of the current season.
    fn preload(&self) {
        let missing: Vec<String> = {
            let state = self.inner.state.borrow();
            state
                .map
                .urls()
                .filter(|url| !state.cache.contains(url))
                .map(str::to_string)
                .collect()
        };
        for url in missing {
            let weak = Rc::downgrade(&self.inner);
            let loaded = url.clone();
            self.inner.loader.load(
                &url,
                Box::new(move |result| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    match result {
                        Ok(()) => inner.state.borrow_mut().cache.insert(&loaded),
                        Err(err) => warn!(%err, "hero preload failed"),
                    }
                }),
            );
        }
    }
}

impl Inner {
    fn src(&self) -> Option<String> {
        self.doc.borrow().attr(self.img, "src").map(str::to_string)
    }

    fn show(&self) {
        let transitioning = self.state.borrow().transitioning;
        let mut doc = self.doc.borrow_mut();
        doc.set_style(self.img, "visibility", "visible");
        if !transitioning {
            doc.set_style(self.img, "opacity", "1");
        }
    }

    fn swap(&self, url: &str, restart_animation: bool) {
        {
            let mut doc = self.doc.borrow_mut();
            if restart_animation {
                doc.remove_class(self.img, SCALEUP_CLASS);
            }
            doc.remove_attr(self.img, "srcset");
            doc.remove_attr(self.img, "sizes");
            doc.set_attr(self.img, "src", url);
            if restart_animation {
                doc.add_class(self.img, SCALEUP_CLASS);
            }
            doc.set_style(self.img, "opacity", "1");
        }
        self.state.borrow_mut().transitioning = false;
    }
}

fn load(inner: &Rc<Inner>, slug: &Slug, animated: bool) {
    let current = inner.src();
    let (url, cached) = {
        let mut state = inner.state.borrow_mut();
        if state.transitioning {
            debug!(%slug, "hero transition in progress, request dropped");
            return;
        }
        let Some(url) = state.map.get(slug).map(str::to_string) else {
            debug!(%slug, season = %state.season, "no hero image for topic");
            return;
        };
        if current.as_deref() == Some(url.as_str()) {
            return;
        }
        state.transitioning = true;
        let cached = state.cache.contains(&url);
        (url, cached)
    };

    if cached {
        transition(inner, url, animated);
        return;
    }
    let weak = Rc::downgrade(inner);
    let topic = slug.clone();
    let request = url.clone();
    inner.loader.load(
        &request,
        Box::new(move |result| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match result {
                Ok(()) => {
                    inner.state.borrow_mut().cache.insert(&url);
                    transition(&inner, url, animated);
                }
                Err(err) => {
                    warn!(topic = %topic, %err, "hero image failed to load, keeping the current one");
                    inner.state.borrow_mut().transitioning = false;
                    inner.show();
                }
            }
        }),
    );
}

fn transition(inner: &Rc<Inner>, url: String, animated: bool) {
    if !animated {
        inner.swap(&url, false);
        return;
    }
    inner
        .doc
        .borrow_mut()
        .set_style(inner.img, "opacity", "0");
    let weak = Rc::downgrade(inner);
    inner.scheduler.after(inner.fade, move || {
        if let Some(inner) = weak.upgrade() {
            inner.swap(&url, true);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentParser;
    use crate::image::HeadlessLoader;

    const PAGE: &str = r#"
<div class="data-source">
  <div data-topic-name="Alps">
    <div data-hero-summer-img="/alps-s.jpg"></div>
    <div data-hero-winter-img="/alps-w.jpg"></div>
  </div>
  <div data-topic-name="Lakes"><div data-hero-summer-img="/lakes-s.jpg"></div></div>
  <div data-topic-name="Coast"></div>
</div>
<img class="hero_img scaleup" src="/start.jpg" srcset="/start-2x.jpg 2x" sizes="100vw" style="opacity: 0; visibility: hidden">"#;

    struct Fixture {
        doc: Rc<RefCell<Document>>,
        scheduler: Scheduler,
        loader: Rc<HeadlessLoader>,
        hero: HeroImage,
    }

    fn fixture() -> Fixture {
        fixture_failing(&[])
    }

    fn fixture_failing(failing: &[&str]) -> Fixture {
        let doc = Rc::new(RefCell::new(Document::parse_html(PAGE)));
        let topics = ContentParser::new(doc.clone(), &Selectors::default()).parse();
        let scheduler = Scheduler::new();
        let loader = Rc::new(HeadlessLoader::new(scheduler.clone()));
        for url in failing {
            loader.fail(url);
        }
        let hero = HeroImage::mount(
            doc.clone(),
            topics,
            loader.clone(),
            scheduler.clone(),
            &Selectors::default(),
            &TimingConfig::default(),
            Season::Summer,
        )
        .unwrap();
        Fixture {
            doc,
            scheduler,
            loader,
            hero,
        }
    }

    fn change(topic: &str, manual: bool) -> TopicChange {
        TopicChange {
            topic: Slug::new(topic).unwrap(),
            manual,
        }
    }

    fn img_style(f: &Fixture, property: &str) -> Option<String> {
        let doc = f.doc.borrow();
        doc.style(f.hero.inner.img, property).map(str::to_string)
    }

    #[test]
    fn mount_shows_image_and_preloads_season() {
        let f = fixture();
        assert_eq!(img_style(&f, "visibility").as_deref(), Some("visible"));
        assert_eq!(img_style(&f, "opacity").as_deref(), Some("1"));
        assert_eq!(f.loader.requests(), vec!["/alps-s.jpg", "/lakes-s.jpg"]);
        f.scheduler.run_until_idle();
        assert_eq!(f.hero.cached(), 2);
    }

    #[test]
    fn initial_selection_swaps_without_fade() {
        let f = fixture();
        f.scheduler.run_until_idle();
        f.hero.on_topic(&change("alps", false));
        assert_eq!(f.hero.src().as_deref(), Some("/alps-s.jpg"));
        assert!(!f.hero.is_transitioning());
        assert_eq!(f.scheduler.pending(), 0);
    }

    #[test]
    fn manual_selection_fades_and_drops_overlapping_requests() {
        let f = fixture();
        f.scheduler.run_until_idle();
        f.hero.on_topic(&change("lakes", true));
        assert!(f.hero.is_transitioning());
        assert_eq!(img_style(&f, "opacity").as_deref(), Some("0"));
        assert_eq!(f.hero.src().as_deref(), Some("/start.jpg"));

        // Arrives mid-transition: dropped.
        f.hero.on_topic(&change("alps", true));

        f.scheduler.advance(Duration::from_millis(199));
        assert_eq!(f.hero.src().as_deref(), Some("/start.jpg"));
        f.scheduler.advance(Duration::from_millis(1));
        assert_eq!(f.hero.src().as_deref(), Some("/lakes-s.jpg"));
        assert!(!f.hero.is_transitioning());
        assert_eq!(img_style(&f, "opacity").as_deref(), Some("1"));

        let doc = f.doc.borrow();
        assert!(!doc.has_attr(f.hero.inner.img, "srcset"));
        assert!(!doc.has_attr(f.hero.inner.img, "sizes"));
        assert!(doc.has_class(f.hero.inner.img, SCALEUP_CLASS));
    }

    #[test]
    fn failed_load_keeps_previous_image() {
        let f = fixture_failing(&["/lakes-s.jpg"]);
        f.scheduler.run_until_idle();
        assert_eq!(f.hero.cached(), 1);
        f.hero.on_topic(&change("lakes", true));
        assert!(f.hero.is_transitioning());
        f.scheduler.run_until_idle();
        assert_eq!(f.hero.src().as_deref(), Some("/start.jpg"));
        assert!(!f.hero.is_transitioning());

        // The guard is released: the next selection goes through.
        f.hero.on_topic(&change("alps", true));
        f.scheduler.run_until_idle();
        assert_eq!(f.hero.src().as_deref(), Some("/alps-s.jpg"));
    }

    #[test]
    fn topic_without_image_keeps_current_one() {
        let f = fixture();
        f.scheduler.run_until_idle();
        f.hero.on_topic(&change("alps", false));
        f.hero.on_topic(&change("coast", true));
        f.hero.on_topic(&change("desert", true));
        f.scheduler.run_until_idle();
        assert_eq!(f.hero.src().as_deref(), Some("/alps-s.jpg"));
        assert!(!f.hero.is_transitioning());
    }

    #[test]
    fn season_update_shows_mapped_image_for_current_topic() {
        let f = fixture();
        f.scheduler.run_until_idle();
        f.hero.on_topic(&change("alps", false));

        f.hero.update_season(Season::Winter, None);
        f.scheduler.run_until_idle();
        assert_eq!(f.hero.season(), Season::Winter);
        assert_eq!(f.hero.src().as_deref(), Some("/alps-w.jpg"));

        // Same season again changes nothing.
        let html = f.doc.borrow().to_html();
        f.hero.update_season(Season::Winter, None);
        f.scheduler.run_until_idle();
        assert_eq!(f.doc.borrow().to_html(), html);
    }

    #[test]
    fn season_without_mapping_keeps_image() {
        let f = fixture();
        f.scheduler.run_until_idle();
        f.hero.on_topic(&change("lakes", false));
        let lakes = Slug::new("lakes").unwrap();
        f.hero.update_season(Season::Winter, Some(&lakes));
        f.scheduler.run_until_idle();
        assert_eq!(f.hero.src().as_deref(), Some("/lakes-s.jpg"));
    }

    #[test]
    fn missing_hero_disables_widget() {
        let doc = Rc::new(RefCell::new(Document::parse_html("<main></main>")));
        let scheduler = Scheduler::new();
        let hero = HeroImage::mount(
            doc,
            Rc::from(Vec::new()),
            Rc::new(HeadlessLoader::new(scheduler.clone())),
            scheduler,
            &Selectors::default(),
            &TimingConfig::default(),
            Season::Summer,
        );
        assert!(hero.is_none());
    }
}
