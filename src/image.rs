//! Off-page image preloading.
//!
//! Widgets never swap a visible `src` before the new image has loaded. The
//! [`ImageLoader`] trait is the seam to whatever actually fetches images;
//! completions are always delivered on a later scheduler turn, never inside
//! the `load` call, so callers may hold their own state borrowed while
//! requesting a load.

use crate::content::Topic;
use crate::scheduler::Scheduler;
use crate::slug::Slug;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("failed to load image: {0}")]
    LoadFailed(String),
}

pub type LoadCallback = Box<dyn FnOnce(Result<(), ImageError>)>;

pub trait ImageLoader {
    /// Start loading `url`; `done` runs on a later turn with the outcome.
    /// Loads cannot be cancelled.
    fn load(&self, url: &str, done: LoadCallback);
}

/// Loader that resolves every request on the next scheduler turn.
///
/// URLs registered with [`HeadlessLoader::fail`] resolve with an error.
pub struct HeadlessLoader {
    scheduler: Scheduler,
    failing: RefCell<HashSet<String>>,
    requests: RefCell<Vec<String>>,
}

impl HeadlessLoader {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            failing: RefCell::new(HashSet::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn fail(&self, url: &str) {
        self.failing.borrow_mut().insert(url.to_string());
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ImageLoader for HeadlessLoader {
    fn load(&self, url: &str, done: LoadCallback) {
        self.requests.borrow_mut().push(url.to_string());
        let result = if self.failing.borrow().contains(url) {
            Err(ImageError::LoadFailed(url.to_string()))
        } else {
            Ok(())
        };
        self.scheduler.defer(move || done(result));
    }
}

/// URLs a widget has already loaded successfully.
///
/// Each widget owns its own cache; caches are never shared.
#[derive(Debug, Default)]
pub struct ImageCache {
    loaded: HashSet<String>,
}

impl ImageCache {
    pub fn contains(&self, url: &str) -> bool {
        self.loaded.contains(url)
    }

    pub fn insert(&mut self, url: &str) {
        self.loaded.insert(url.to_string());
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

/// The one image a widget shows per topic, for a single season.
///
/// Topics without an image for the season are absent, which widgets treat as
/// "keep whatever is showing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonImageMap {
    urls: BTreeMap<Slug, String>,
}

impl SeasonImageMap {
    pub fn build<'a>(topics: &'a [Topic], pick: impl Fn(&'a Topic) -> Option<&'a str>) -> Self {
        let urls = topics
            .iter()
            .filter_map(|t| pick(t).map(|url| (t.slug.clone(), url.to_string())))
            .collect();
        Self { urls }
    }

    pub fn get(&self, slug: &Slug) -> Option<&str> {
        self.urls.get(slug).map(String::as_str)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.urls.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn completes_on_a_later_turn() {
        let scheduler = Scheduler::new();
        let loader = HeadlessLoader::new(scheduler.clone());
        let outcome = Rc::new(RefCell::new(None));
        let o = outcome.clone();
        loader.load("a.jpg", Box::new(move |r| *o.borrow_mut() = Some(r)));

        assert!(outcome.borrow().is_none());
        scheduler.run_until_idle();
        assert_eq!(*outcome.borrow(), Some(Ok(())));
        assert_eq!(loader.requests(), vec!["a.jpg"]);
    }

    #[test]
    fn failing_urls_report_errors() {
        let scheduler = Scheduler::new();
        let loader = HeadlessLoader::new(scheduler.clone());
        loader.fail("broken.jpg");
        let outcome = Rc::new(RefCell::new(None));
        let o = outcome.clone();
        loader.load("broken.jpg", Box::new(move |r| *o.borrow_mut() = Some(r)));
        scheduler.run_until_idle();
        assert_eq!(
            *outcome.borrow(),
            Some(Err(ImageError::LoadFailed("broken.jpg".into())))
        );
    }

    #[test]
    fn season_map_skips_topics_without_an_image() {
        use crate::types::Season;
        use std::collections::BTreeMap;

        let topic = |name: &str, hero: Option<&str>| Topic {
            slug: Slug::new(name).unwrap(),
            display_name: name.to_string(),
            gallery_name: None,
            images: BTreeMap::new(),
            hero_images: hero
                .map(|url| BTreeMap::from([(Season::Winter, url.to_string())]))
                .unwrap_or_default(),
            quote_images: BTreeMap::new(),
        };
        let topics = vec![topic("Alps", Some("/alps-w.jpg")), topic("Lakes", None)];

        let winter = SeasonImageMap::build(&topics, |t| t.hero_image(Season::Winter));
        assert_eq!(winter.len(), 1);
        assert_eq!(winter.get(&Slug::new("alps").unwrap()), Some("/alps-w.jpg"));
        assert_eq!(winter.get(&Slug::new("lakes").unwrap()), None);

        let summer = SeasonImageMap::build(&topics, |t| t.hero_image(Season::Summer));
        assert!(summer.is_empty());
    }

    #[test]
    fn cache_tracks_loaded_urls() {
        let mut cache = ImageCache::default();
        assert!(cache.is_empty());
        cache.insert("a.jpg");
        cache.insert("a.jpg");
        assert!(cache.contains("a.jpg"));
        assert_eq!(cache.len(), 1);
    }
}
