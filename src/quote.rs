//! Quote image swap.
//!
//! Like the hero, but without a fade: the visible image is replaced as soon
//! as the new one has loaded. Overlapping loads are allowed; only the most
//! recently requested URL may land, so a slow earlier load never overwrites
//! a newer selection.
//!
//! A page that presents the quote as a video has no quote image to manage,
//! and the widget stays disabled.

use crate::bus::{TopicBus, TopicChange};
use crate::config::Selectors;
use crate::content::Topic;
use crate::dom::{Document, NodeId};
use crate::image::{ImageCache, ImageLoader, SeasonImageMap};
use crate::slug::Slug;
use crate::types::Season;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

struct State {
    season: Season,
    map: SeasonImageMap,
    topic: Option<Slug>,
    pending: Option<String>,
    cache: ImageCache,
}

struct Inner {
    doc: Rc<RefCell<Document>>,
    img: NodeId,
    topics: Rc<[Topic]>,
    loader: Rc<dyn ImageLoader>,
    state: RefCell<State>,
}

#[derive(Clone)]
pub struct QuoteImage {
    inner: Rc<Inner>,
}

impl QuoteImage {
    /// `None` when the page shows a quote video or has no quote image.
    pub fn mount(
        doc: Rc<RefCell<Document>>,
        topics: Rc<[Topic]>,
        loader: Rc<dyn ImageLoader>,
        selectors: &Selectors,
        season: Season,
    ) -> Option<Self> {
        let img = {
            let doc = doc.borrow();
            if doc.query(doc.root(), &selectors.quote_video).is_some() {
                debug!("quote video present, quote image swap disabled");
                return None;
            }
            doc.query(doc.root(), &selectors.quote_image)
        };
        let Some(img) = img else {
            debug!(selector = %selectors.quote_image, "no quote image, quote swap disabled");
            return None;
        };
        let map = SeasonImageMap::build(&topics, |t| t.quote_image(season));
        let quote = Self {
            inner: Rc::new(Inner {
                doc,
                img,
                topics,
                loader,
                state: RefCell::new(State {
                    season,
                    map,
                    topic: None,
                    pending: None,
                    cache: ImageCache::default(),
                }),
            }),
        };
        quote.inner.show();
        Some(quote)
    }

    pub fn subscribe(&self, bus: &TopicBus) {
        let quote = self.clone();
        bus.subscribe("quote", move |change| quote.on_topic(change));
    }

    pub fn on_topic(&self, change: &TopicChange) {
        self.inner.state.borrow_mut().topic = Some(change.topic.clone());
        load(&self.inner, &change.topic);
    }

    pub fn update_season(&self, season: Season, topic: Option<&Slug>) {
        let topic = {
            let mut state = self.inner.state.borrow_mut();
            state.season = season;
            state.map = SeasonImageMap::build(&self.inner.topics, |t| t.quote_image(season));
            if let Some(topic) = topic {
                state.topic = Some(topic.clone());
            }
            state.topic.clone()
        };
        if let Some(topic) = topic {
            load(&self.inner, &topic);
        }
    }

    pub fn season(&self) -> Season {
        self.inner.state.borrow().season
    }

    pub fn src(&self) -> Option<String> {
        self.inner.doc.borrow().attr(self.inner.img, "src").map(str::to_string)
    }
}

impl Inner {
    fn show(&self) {
        let mut doc = self.doc.borrow_mut();
        doc.set_style(self.img, "visibility", "visible");
        doc.set_style(self.img, "opacity", "1");
    }

    fn swap(&self, url: &str) {
        {
            let mut doc = self.doc.borrow_mut();
            doc.remove_attr(self.img, "srcset");
            doc.remove_attr(self.img, "sizes");
            doc.set_attr(self.img, "src", url);
        }
        self.show();
    }
}

fn load(inner: &Rc<Inner>, slug: &Slug) {
    let current = inner.doc.borrow().attr(inner.img, "src").map(str::to_string);
    let (url, cached) = {
        let mut state = inner.state.borrow_mut();
        let Some(url) = state.map.get(slug).map(str::to_string) else {
            debug!(%slug, season = %state.season, "no quote image for topic");
            return;
        };
        if current.as_deref() == Some(url.as_str()) {
            // Supersedes anything still loading.
            state.pending = None;
            return;
        }
        let cached = state.cache.contains(&url);
        state.pending = if cached { None } else { Some(url.clone()) };
        (url, cached)
    };

    if cached {
        inner.swap(&url);
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
            {
                let mut state = inner.state.borrow_mut();
                if state.pending.as_deref() != Some(url.as_str()) {
                    debug!(%url, "stale quote image load ignored");
                    return;
                }
                state.pending = None;
                if result.is_ok() {
                    state.cache.insert(&url);
                }
            }
            match result {
                Ok(()) => inner.swap(&url),
                Err(err) => {
                    warn!(topic = %topic, %err, "quote image failed to load, keeping the current one");
                    inner.show();
                }
            }
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentParser;
    use crate::image::HeadlessLoader;
    use crate::scheduler::Scheduler;

    const CONTENT: &str = r#"
<div class="data-source">
  <div data-topic-name="Alps">
    <div data-quote-summer-img="/alps-q-s.jpg"></div>
    <div data-quote-winter-img="/alps-q-w.jpg"></div>
  </div>
  <div data-topic-name="Lakes"><div data-quote-summer-img="/lakes-q-s.jpg"></div></div>
</div>"#;

    struct Fixture {
        scheduler: Scheduler,
        loader: Rc<HeadlessLoader>,
        quote: QuoteImage,
    }

    fn mount(extra: &str, failing: &[&str]) -> (Scheduler, Rc<HeadlessLoader>, Option<QuoteImage>) {
        let doc = Rc::new(RefCell::new(Document::parse_html(&format!("{CONTENT}{extra}"))));
        let topics = ContentParser::new(doc.clone(), &Selectors::default()).parse();
        let scheduler = Scheduler::new();
        let loader = Rc::new(HeadlessLoader::new(scheduler.clone()));
        for url in failing {
            loader.fail(url);
        }
        let quote = QuoteImage::mount(
            doc,
            topics,
            loader.clone(),
            &Selectors::default(),
            Season::Summer,
        );
        (scheduler, loader, quote)
    }

    fn fixture(failing: &[&str]) -> Fixture {
        let (scheduler, loader, quote) =
            mount(r#"<img data-quote-image src="/q-start.jpg" srcset="/q-2x.jpg 2x">"#, failing);
        Fixture {
            scheduler,
            loader,
            quote: quote.unwrap(),
        }
    }

    fn change(topic: &str) -> TopicChange {
        TopicChange {
            topic: Slug::new(topic).unwrap(),
            manual: true,
        }
    }

    #[test]
    fn swaps_after_load_without_fade() {
        let f = fixture(&[]);
        f.quote.on_topic(&change("lakes"));
        assert_eq!(f.quote.src().as_deref(), Some("/q-start.jpg"));
        f.scheduler.run_until_idle();
        assert_eq!(f.quote.src().as_deref(), Some("/lakes-q-s.jpg"));
        assert_eq!(f.loader.requests(), vec!["/lakes-q-s.jpg"]);
    }

    #[test]
    fn only_latest_request_lands() {
        let f = fixture(&[]);
        f.quote.on_topic(&change("alps"));
        f.quote.on_topic(&change("lakes"));
        f.scheduler.run_until_idle();
        assert_eq!(f.quote.src().as_deref(), Some("/lakes-q-s.jpg"));
    }

    #[test]
    fn failure_keeps_previous_image() {
        let f = fixture(&["/lakes-q-s.jpg"]);
        f.quote.on_topic(&change("alps"));
        f.scheduler.run_until_idle();
        f.quote.on_topic(&change("lakes"));
        f.scheduler.run_until_idle();
        assert_eq!(f.quote.src().as_deref(), Some("/alps-q-s.jpg"));
    }

    #[test]
    fn season_update_reloads_current_topic() {
        let f = fixture(&[]);
        f.quote.on_topic(&change("alps"));
        f.scheduler.run_until_idle();
        f.quote.update_season(Season::Winter, None);
        f.scheduler.run_until_idle();
        assert_eq!(f.quote.season(), Season::Winter);
        assert_eq!(f.quote.src().as_deref(), Some("/alps-q-w.jpg"));

        // Back to summer comes straight from the cache.
        f.quote.update_season(Season::Summer, None);
        assert_eq!(f.quote.src().as_deref(), Some("/alps-q-s.jpg"));
    }

    #[test]
    fn video_disables_the_widget() {
        let (_, _, quote) = mount(
            r#"<img data-quote-image src="/q.jpg"><video data-quote-video></video>"#,
            &[],
        );
        assert!(quote.is_none());
        let (_, _, quote) = mount("", &[]);
        assert!(quote.is_none());
    }
}
