//! Topic content embedded in the page.
//!
//! The page carries its gallery data as attributes inside a hidden container:
//!
//! ```html
//! <div class="data-source">
//!   <div data-topic-name="Alps & Lakes" data-gallery-name="Alpine Lakes">
//!     <div class="images-gallery" data-season="summer">
//!       <div data-img-url="/img/alps-1.jpg"></div>
//!       <div data-img-url="/img/alps-2.jpg"></div>
//!     </div>
//!     <div class="images-gallery" data-season="winter">...</div>
//!     <div data-hero-summer-img="/img/alps-hero.jpg"></div>
//!     <div data-quote-winter-img="/img/alps-quote-w.jpg"></div>
//!   </div>
//! </div>
//! ```
//!
//! Absence is never an error: a missing attribute is a missing value, a topic
//! without images for a season simply shows nothing, and lookups for unknown
//! slugs return empty results.

use crate::config::Selectors;
use crate::dom::{Document, NodeId};
use crate::slug::Slug;
use crate::types::{Season, TopicImages};
use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, warn};

pub const TOPIC_NAME_ATTR: &str = "data-topic-name";
pub const GALLERY_NAME_ATTR: &str = "data-gallery-name";
pub const SEASON_ATTR: &str = "data-season";
pub const IMAGE_URL_ATTR: &str = "data-img-url";

pub fn hero_attr(season: Season) -> String {
    format!("data-hero-{season}-img")
}

pub fn quote_attr(season: Season) -> String {
    format!("data-quote-{season}-img")
}

/// One content group from the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// Unique key for every cross-component lookup.
    pub slug: Slug,
    /// Label as written in the markup.
    pub display_name: String,
    /// Optional gallery tab label.
    pub gallery_name: Option<String>,
    pub images: BTreeMap<Season, Vec<String>>,
    pub hero_images: BTreeMap<Season, String>,
    pub quote_images: BTreeMap<Season, String>,
}

impl Topic {
    pub fn season_images(&self, season: Season) -> &[String] {
        self.images.get(&season).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn hero_image(&self, season: Season) -> Option<&str> {
        self.hero_images.get(&season).map(String::as_str)
    }

    pub fn quote_image(&self, season: Season) -> Option<&str> {
        self.quote_images.get(&season).map(String::as_str)
    }

    /// Label for the gallery tab: the gallery name, else the topic name.
    pub fn tab_label(&self) -> &str {
        self.gallery_name.as_deref().unwrap_or(&self.display_name)
    }
}

/// Reads topics from the page once and serves lookups from the cached result.
///
/// The cache is never revalidated against later DOM changes.
pub struct ContentParser {
    doc: Rc<RefCell<Document>>,
    selectors: Selectors,
    topics: OnceCell<Rc<[Topic]>>,
}

impl ContentParser {
    pub fn new(doc: Rc<RefCell<Document>>, selectors: &Selectors) -> Self {
        Self {
            doc,
            selectors: selectors.clone(),
            topics: OnceCell::new(),
        }
    }

    /// All topics in document order. Parses on first call only.
    pub fn parse(&self) -> Rc<[Topic]> {
        self.topics
            .get_or_init(|| parse_topics(&self.doc.borrow(), &self.selectors).into())
            .clone()
    }

    pub fn topic(&self, slug: &str) -> Option<Topic> {
        self.parse().iter().find(|t| t.slug == slug).cloned()
    }

    pub fn season_images(&self, slug: &str, season: Season) -> Vec<String> {
        self.topic(slug)
            .map(|t| t.season_images(season).to_vec())
            .unwrap_or_default()
    }

    pub fn hero_image(&self, slug: &str, season: Season) -> Option<String> {
        self.topic(slug)
            .and_then(|t| t.hero_image(season).map(str::to_string))
    }

    pub fn quote_image(&self, slug: &str, season: Season) -> Option<String> {
        self.topic(slug)
            .and_then(|t| t.quote_image(season).map(str::to_string))
    }

    /// Everything a topic shows for one season; `None` for unknown slugs.
    pub fn all_topic_images(&self, slug: &str, season: Season) -> Option<TopicImages> {
        let topic = self.topic(slug)?;
        Some(TopicImages {
            gallery_images: topic.season_images(season).to_vec(),
            hero_image: topic.hero_image(season).map(str::to_string),
            quote_image: topic.quote_image(season).map(str::to_string),
        })
    }
}

fn parse_topics(doc: &Document, selectors: &Selectors) -> Vec<Topic> {
    let Some(source) = doc.query(doc.root(), &selectors.content_source) else {
        debug!(selector = %selectors.content_source, "no content source on page");
        return Vec::new();
    };

    let mut topics: Vec<Topic> = Vec::new();
    for item in doc.query_all(source, &selectors.topic_entry) {
        let display_name = doc.attr(item, TOPIC_NAME_ATTR).unwrap_or_default();
        let Some(slug) = Slug::new(display_name) else {
            debug!(name = display_name, "skipping topic with empty slug");
            continue;
        };
        if topics.iter().any(|t| t.slug == slug) {
            warn!(%slug, "duplicate topic slug, keeping the first occurrence");
            continue;
        }

        let mut images = BTreeMap::new();
        for group in doc.query_all(item, &selectors.season_gallery) {
            let tag = doc.attr(group, SEASON_ATTR).unwrap_or_default();
            let Ok(season) = tag.parse::<Season>() else {
                debug!(%slug, season = tag, "ignoring image group with unknown season");
                continue;
            };
            let urls: Vec<String> = doc
                .query_all(group, &selectors.gallery_image)
                .into_iter()
                .filter_map(|img| doc.attr(img, IMAGE_URL_ATTR))
                .map(str::to_string)
                .collect();
            // A repeated season group replaces the earlier one.
            if images.insert(season, urls).is_some() {
                debug!(%slug, %season, "duplicate image group, keeping the last");
            }
        }

        let mut hero_images = BTreeMap::new();
        let mut quote_images = BTreeMap::new();
        for season in Season::ALL {
            if let Some(url) = first_attr(doc, item, &hero_attr(season)) {
                hero_images.insert(season, url);
            }
            if let Some(url) = first_attr(doc, item, &quote_attr(season)) {
                quote_images.insert(season, url);
            }
        }

        topics.push(Topic {
            slug,
            display_name: display_name.trim().to_string(),
            gallery_name: doc
                .attr(item, GALLERY_NAME_ATTR)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            images,
            hero_images,
            quote_images,
        });
    }
    topics
}

/// Value of `attr` on the first descendant of `scope` carrying it.
fn first_attr(doc: &Document, scope: NodeId, attr: &str) -> Option<String> {
    doc.descendants(scope)
        .into_iter()
        .find_map(|n| doc.attr(n, attr))
        .map(str::to_string)
}
