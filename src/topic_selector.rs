//! Topic selector: the one place a topic becomes "selected".
//!
//! Owns the topic carousel and the topic controls rendered into it. A
//! selection updates, in this order:
//!
//! 1. the `is-active` marker (exactly one control) and ARIA state of its slide
//! 2. the session's current topic
//! 3. the query string (manual selections only, by replacement)
//! 4. every bus subscriber, synchronously
//! 5. the topic carousel position
//!
//! Re-selecting the current topic changes nothing and notifies nobody.

use crate::bus::{TopicBus, TopicChange};
use crate::carousel::{Carousel, CarouselFactory};
use crate::config::SiteConfig;
use crate::dom::{Document, NodeId, Selector};
use crate::render::TOPIC_ATTR;
use crate::session::SharedSession;
use crate::slug::Slug;
use crate::url_sync::{History, write_topic};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

pub const ACTIVE_CLASS: &str = "is-active";

pub struct TopicSelector {
    doc: Rc<RefCell<Document>>,
    session: SharedSession,
    bus: Rc<TopicBus>,
    history: Rc<RefCell<History>>,
    query_param: String,
    slide: Selector,
    controls: Vec<(NodeId, Slug)>,
    carousel: Option<Box<dyn Carousel>>,
}

impl TopicSelector {
    pub fn new(
        doc: Rc<RefCell<Document>>,
        session: SharedSession,
        bus: Rc<TopicBus>,
        history: Rc<RefCell<History>>,
        config: &SiteConfig,
        carousels: &dyn CarouselFactory,
    ) -> Self {
        let selectors = &config.selectors;
        let controls = {
            let doc = doc.borrow();
            doc.query_all(doc.root(), &selectors.topic_control)
                .into_iter()
                .filter_map(|node| {
                    let slug = Slug::new(doc.attr(node, TOPIC_ATTR).unwrap_or_default());
                    if slug.is_none() {
                        debug!("topic control without a usable slug");
                    }
                    slug.map(|slug| (node, slug))
                })
                .collect()
        };
        let carousel = carousels.create(&selectors.topic_carousel, &config.carousels.topic);

        let selector = Self {
            doc,
            session,
            bus,
            history,
            query_param: config.query_param.clone(),
            slide: selectors.carousel_slide.clone(),
            controls,
            carousel,
        };
        selector.correct_aria(&selectors.topic_wrapper);
        selector
    }

    /// Slugs of every control, in document order.
    pub fn topics(&self) -> Vec<Slug> {
        self.controls.iter().map(|(_, slug)| slug.clone()).collect()
    }

    pub fn carousel_index(&self) -> Option<usize> {
        self.carousel.as_ref().map(|c| c.active_index())
    }

    /// First control in document order carrying `slug`.
    fn index_of(&self, slug: &Slug) -> Option<usize> {
        self.controls.iter().position(|(_, s)| s == slug)
    }

    /// Tab semantics for the carousel slides: a tablist with exactly one
    /// selected tab.
    fn correct_aria(&self, wrapper: &Selector) {
        let mut doc = self.doc.borrow_mut();
        let Some(wrapper) = doc.query(doc.root(), wrapper) else {
            return;
        };
        doc.set_attr(wrapper, "role", "tablist");
        let slides = doc.query_all(wrapper, &self.slide);
        for &slide in &slides {
            doc.set_attr(slide, "role", "tab");
            if !doc.has_attr(slide, "aria-selected") {
                doc.set_attr(slide, "aria-selected", "false");
            }
        }
        let any_selected = slides
            .iter()
            .any(|&s| doc.attr(s, "aria-selected") == Some("true"));
        if let (false, Some(&first)) = (any_selected, slides.first()) {
            doc.set_attr(first, "aria-selected", "true");
        }
    }

    fn mark_active(&self, index: usize) {
        let mut doc = self.doc.borrow_mut();
        for (i, &(control, _)) in self.controls.iter().enumerate() {
            let active = i == index;
            if active {
                doc.add_class(control, ACTIVE_CLASS);
            } else {
                doc.remove_class(control, ACTIVE_CLASS);
            }
            if let Some(slide) = doc.closest(control, &self.slide) {
                doc.set_attr(slide, "aria-selected", if active { "true" } else { "false" });
            }
        }
    }

    fn select(&mut self, index: usize, manual: bool) -> Slug {
        let slug = self.controls[index].1.clone();
        self.mark_active(index);
        self.session.borrow_mut().set_topic(slug.clone());
        if manual {
            write_topic(&mut self.history.borrow_mut(), &self.query_param, &slug);
        }
        self.bus.publish(&TopicChange {
            topic: slug.clone(),
            manual,
        });
        if let Some(carousel) = self.carousel.as_mut() {
            carousel.slide_to(index);
        }
        slug
    }

    /// Programmatic first selection: the topic named in the URL when it is a
    /// known control, else the first control. Broadcast as non-manual and
    /// never written back to the URL.
    pub fn select_initial(&mut self, url_topic: Option<&str>) -> Option<Slug> {
        let requested = url_topic.and_then(Slug::new);
        let index = match requested.as_ref().and_then(|slug| self.index_of(slug)) {
            Some(index) => index,
            None => {
                if let Some(slug) = &requested {
                    debug!(%slug, "url topic unknown, falling back to the first topic");
                }
                if self.controls.is_empty() {
                    debug!("no topic controls, nothing to select");
                    return None;
                }
                0
            }
        };
        Some(self.select(index, false))
    }

    /// A user click on the control for `topic`. Returns whether anything
    /// changed.
    pub fn click(&mut self, topic: &str) -> bool {
        let Some(slug) = Slug::new(topic) else {
            return false;
        };
        if self.session.borrow().topic() == Some(&slug) {
            debug!(%slug, "topic already selected");
            return false;
        }
        let Some(index) = self.index_of(&slug) else {
            debug!(%slug, "no control for topic");
            return false;
        };
        self.select(index, true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carousel::HeadlessCarouselFactory;
    use crate::scheduler::Scheduler;
    use crate::session::Session;
    use crate::types::Season;
    use url::Url;

    const PAGE: &str = r#"
<div class="swiper is-topic"><div class="swiper-wrapper is-topic">
  <div class="swiper-slide"><a class="topic_button" data-topic="alps">Alps</a></div>
  <div class="swiper-slide"><a class="topic_button" data-topic="Lakes">Lakes</a></div>
  <div class="swiper-slide"><a class="topic_button" data-topic="coast">Coast</a></div>
  <div class="swiper-slide"><a class="topic_button" data-topic="lakes">Lakes again</a></div>
</div></div>"#;

    struct Fixture {
        doc: Rc<RefCell<Document>>,
        session: SharedSession,
        bus: Rc<TopicBus>,
        history: Rc<RefCell<History>>,
        heard: Rc<RefCell<Vec<TopicChange>>>,
        selector: TopicSelector,
    }

    fn fixture(url: &str) -> Fixture {
        let doc = Rc::new(RefCell::new(Document::parse_html(PAGE)));
        let session = Session::shared(Season::Summer);
        let bus = Rc::new(TopicBus::new());
        let history = Rc::new(RefCell::new(History::new(Url::parse(url).unwrap())));
        let config = SiteConfig::default();
        let factory = HeadlessCarouselFactory::new(
            doc.clone(),
            Scheduler::new(),
            config.selectors.carousel_slide.clone(),
        );
        let heard = Rc::new(RefCell::new(Vec::new()));
        let h = heard.clone();
        bus.subscribe("probe", move |c| h.borrow_mut().push(c.clone()));
        let selector = TopicSelector::new(
            doc.clone(),
            session.clone(),
            bus.clone(),
            history.clone(),
            &config,
            &factory,
        );
        Fixture {
            doc,
            session,
            bus,
            history,
            heard,
            selector,
        }
    }

    fn active_topics(doc: &Document) -> Vec<String> {
        let sel = Selector::parse(".topic_button.is-active").unwrap();
        doc.query_all(doc.root(), &sel)
            .into_iter()
            .filter_map(|n| doc.attr(n, TOPIC_ATTR).map(str::to_string))
            .collect()
    }

    fn selected_slides(doc: &Document) -> usize {
        let sel = Selector::parse(".swiper-slide[aria-selected=true]").unwrap();
        doc.query_all(doc.root(), &sel).len()
    }

    #[test]
    fn aria_roles_are_corrected_on_construction() {
        let f = fixture("https://example.com/");
        let doc = f.doc.borrow();
        let wrapper = doc
            .query(doc.root(), &Selector::parse(".swiper-wrapper").unwrap())
            .unwrap();
        assert_eq!(doc.attr(wrapper, "role"), Some("tablist"));
        let tabs = doc.query_all(doc.root(), &Selector::parse("[role=tab]").unwrap());
        assert_eq!(tabs.len(), 4);
        assert_eq!(selected_slides(&doc), 1);
        assert_eq!(doc.attr(tabs[0], "aria-selected"), Some("true"));
    }

    #[test]
    fn initial_selection_from_url_is_not_manual() {
        let mut f = fixture("https://example.com/?topic=Lakes");
        let slug = f.selector.select_initial(Some("Lakes"));
        assert_eq!(slug.as_ref().map(Slug::as_str), Some("lakes"));
        assert_eq!(
            *f.heard.borrow(),
            vec![TopicChange {
                topic: Slug::new("lakes").unwrap(),
                manual: false
            }]
        );
        // First matching control wins, and the URL is left alone.
        assert_eq!(f.selector.carousel_index(), Some(1));
        assert_eq!(active_topics(&f.doc.borrow()), vec!["Lakes"]);
        assert_eq!(f.history.borrow().replacements(), 0);
    }

    #[test]
    fn unknown_url_topic_falls_back_to_first() {
        let mut f = fixture("https://example.com/?topic=desert");
        let slug = f.selector.select_initial(Some("desert")).unwrap();
        assert_eq!(slug.as_str(), "alps");
        assert_eq!(f.session.borrow().topic(), Some(&slug));
    }

    #[test]
    fn click_marks_one_control_and_writes_url() {
        let mut f = fixture("https://example.com/?lang=de");
        f.selector.select_initial(None);
        assert!(f.selector.click("Coast"));

        let doc = f.doc.borrow();
        assert_eq!(active_topics(&doc), vec!["coast"]);
        assert_eq!(selected_slides(&doc), 1);
        assert_eq!(f.selector.carousel_index(), Some(2));
        assert_eq!(
            f.history.borrow().url().as_str(),
            "https://example.com/?lang=de&topic=coast"
        );
        let heard = f.heard.borrow();
        assert_eq!(heard.len(), 2);
        assert!(heard[1].manual);
    }

    #[test]
    fn repeated_click_is_a_no_op() {
        let mut f = fixture("https://example.com/");
        f.selector.select_initial(None);
        assert!(f.selector.click("lakes"));
        let html = f.doc.borrow().to_html();
        assert!(!f.selector.click("LAKES"));
        assert_eq!(f.doc.borrow().to_html(), html);
        assert_eq!(f.history.borrow().replacements(), 1);
        assert_eq!(f.bus.published(), 2);
    }

    #[test]
    fn click_on_unknown_topic_changes_nothing() {
        let mut f = fixture("https://example.com/");
        f.selector.select_initial(None);
        assert!(!f.selector.click("desert"));
        assert!(!f.selector.click("  "));
        assert_eq!(f.bus.published(), 1);
        assert_eq!(f.session.borrow().topic().unwrap().as_str(), "alps");
    }
}
