//! Shared test utilities for the topic-sync test suite.
//!
//! Provides the sample page built from `fixtures/content.toml`, helpers that
//! mount it headlessly, and lookups that panic with the available choices on
//! a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut system = mount_fixture("https://lodge.example/?topic=lakes");
//! system.click_topic("coast");
//! system.run_until_idle();
//!
//! let snapshot = system.snapshot();
//! assert_eq!(snapshot.hero_src.as_deref(), Some("/img/coast-hero-s.jpg"));
//! assert_eq!(find_topic(system.topics(), "coast").display_name, "Coast");
//! ```

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use url::Url;

use crate::config::SiteConfig;
use crate::content::Topic;
use crate::dom::{Document, NodeId, Selector};
use crate::markup::{ContentFile, page_html};
use crate::system::{Environment, GallerySystem, HeadlessOptions};
use crate::types::Season;

// =========================================================================
// Fixture setup
// =========================================================================

/// The sample content from `fixtures/content.toml`.
pub fn fixture_content() -> ContentFile {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content.toml");
    ContentFile::load(&path)
        .unwrap_or_else(|err| panic!("cannot load {}: {err}", path.display()))
}

/// The sample page, rendered for `season`.
pub fn fixture_html(season: Season) -> String {
    page_html(&fixture_content(), season)
}

pub fn fixture_document(season: Season) -> Rc<RefCell<Document>> {
    Rc::new(RefCell::new(Document::parse_html(&fixture_html(season))))
}

/// Mount the sample page at `url` with stock config and let it settle.
pub fn mount_fixture(url: &str) -> GallerySystem {
    mount_with(url, &SiteConfig::default(), &HeadlessOptions::default())
}

/// Mount the sample page with custom config and headless options, then let
/// it settle.
pub fn mount_with(url: &str, config: &SiteConfig, options: &HeadlessOptions) -> GallerySystem {
    let doc = fixture_document(config.default_season);
    let env = Environment::headless(&doc, &config.selectors, options);
    let url = Url::parse(url).unwrap_or_else(|err| panic!("bad test url '{url}': {err}"));
    let system = GallerySystem::mount(doc, url, env, config);
    system.run_until_idle();
    system
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a topic by slug. Panics if not found.
pub fn find_topic<'a>(topics: &'a [Topic], slug: &str) -> &'a Topic {
    topics.iter().find(|t| t.slug == slug).unwrap_or_else(|| {
        let slugs: Vec<&str> = topics.iter().map(|t| t.slug.as_str()).collect();
        panic!("topic '{slug}' not found. Available: {slugs:?}")
    })
}

/// First node matching `selector`. Panics if the page has none.
pub fn find_node(doc: &Document, selector: &str) -> NodeId {
    let parsed = Selector::parse(selector)
        .unwrap_or_else(|err| panic!("bad test selector '{selector}': {err}"));
    doc.query(doc.root(), &parsed)
        .unwrap_or_else(|| panic!("no element matches '{selector}'"))
}

/// Attribute of the first node matching `selector`. Panics if either is
/// missing.
pub fn attr_of(doc: &Document, selector: &str, attr: &str) -> String {
    let node = find_node(doc, selector);
    doc.attr(node, attr)
        .unwrap_or_else(|| panic!("'{selector}' has no '{attr}' attribute"))
        .to_string()
}

/// `attr` of every node matching `selector`, in document order.
pub fn attrs_of(doc: &Document, selector: &str, attr: &str) -> Vec<String> {
    let parsed = Selector::parse(selector)
        .unwrap_or_else(|err| panic!("bad test selector '{selector}': {err}"));
    doc.query_all(doc.root(), &parsed)
        .into_iter()
        .filter_map(|n| doc.attr(n, attr).map(str::to_string))
        .collect()
}

/// Image sources of the gallery slides, in order.
pub fn slide_sources(doc: &Document) -> Vec<String> {
    attrs_of(doc, "img.gallery_img", "src")
}
