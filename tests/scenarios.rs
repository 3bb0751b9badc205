//! End-to-end scenarios on the sample page.
//!
//! Each test renders `fixtures/content.toml` into a page, mounts it headlessly
//! and drives it only through the public API, the way the `simulate` command
//! does.
//!
//! Run with: cargo test --test scenarios

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use topic_sync::bus::TopicChange;
use topic_sync::config::SiteConfig;
use topic_sync::dom::Document;
use topic_sync::markup::{ContentFile, page_html};
use topic_sync::slug::Slug;
use topic_sync::system::{Action, Environment, GallerySystem, HeadlessOptions, SystemSnapshot};
use topic_sync::types::Season;
use url::Url;

const CONTENT: &str = include_str!("../fixtures/content.toml");

fn mount(url: &str, failing_images: &[&str]) -> GallerySystem {
    mount_content(CONTENT, url, failing_images)
}

fn mount_content(content: &str, url: &str, failing_images: &[&str]) -> GallerySystem {
    let config = SiteConfig::default();
    let content = ContentFile::parse(content).unwrap();
    let html = page_html(&content, config.default_season);
    let doc = Rc::new(RefCell::new(Document::parse_html(&html)));
    let options = HeadlessOptions {
        failing_images: failing_images.iter().map(|u| u.to_string()).collect(),
        ..HeadlessOptions::default()
    };
    let env = Environment::headless(&doc, &config.selectors, &options);
    let system = GallerySystem::mount(doc, Url::parse(url).unwrap(), env, &config);
    system.run_until_idle();
    system
}

fn slug(s: &str) -> Slug {
    Slug::new(s).unwrap()
}

/// The gallery-facing part of a snapshot.
fn gallery_state(snapshot: &SystemSnapshot) -> (Vec<Slug>, Option<usize>) {
    (snapshot.gallery_tabs.clone(), snapshot.gallery_carousel)
}

// =========================================================================
// Convergence
// =========================================================================

#[test]
fn topic_click_and_tab_click_converge() {
    let mut via_topic = mount("https://lodge.example/", &[]);
    via_topic.apply(&Action::Topic("lakes".into()));

    let mut via_tab = mount("https://lodge.example/", &[]);
    via_tab.apply(&Action::Tab("lakes".into()));

    let a = via_topic.snapshot();
    let b = via_tab.snapshot();
    assert_eq!(gallery_state(&a), (vec![slug("lakes")], Some(2)));
    assert_eq!(gallery_state(&a), gallery_state(&b));

    let doc = via_topic.document();
    let html = doc.to_html();
    assert_eq!(html.matches("is-custom-current").count(), 1);
    assert_eq!(html.matches("swiper-slide-active").count(), 2);
}

#[test]
fn tab_click_normalizes_its_slug() {
    let mut system = mount("https://lodge.example/", &[]);
    system.apply(&Action::Tab("  Forest   Trails ".into()));
    assert_eq!(system.snapshot().gallery_tabs, [slug("forest-trails")]);
}

// =========================================================================
// Idempotence
// =========================================================================

#[test]
fn repeated_manual_selection_is_a_no_op() {
    let mut system = mount("https://lodge.example/", &[]);
    assert!(system.click_topic("coast"));
    system.run_until_idle();
    let first = system.snapshot();

    assert!(!system.click_topic("coast"));
    assert!(!system.click_topic("Coast"));
    system.run_until_idle();
    let second = system.snapshot();

    assert_eq!(first, second);
    assert_eq!(second.url_writes, 1);
    assert_eq!(second.active_controls, ["coast"]);
    assert_eq!(second.notifications.len(), 2);
}

// =========================================================================
// Season
// =========================================================================

#[test]
fn season_toggle_keeps_topic_and_publishes_nothing() {
    let mut system = mount("https://lodge.example/?topic=lakes", &[]);
    let before = system.snapshot();

    system.apply(&Action::ToggleSeason);
    let after = system.snapshot();

    assert_eq!(after.season, Season::Winter);
    assert_eq!(after.topic, before.topic);
    assert_eq!(after.notifications, before.notifications);
    assert_eq!(system.bus().published(), 1);
    assert_eq!(after.url, before.url);
    assert_eq!(after.hero_src.as_deref(), Some("/img/lakes-hero-w.jpg"));
    assert_eq!(after.quote_src.as_deref(), Some("/img/lakes-quote-w.jpg"));
    assert_eq!(after.gallery_slides, 3);
    assert_eq!(gallery_state(&after), (vec![slug("lakes")], Some(1)));
}

#[test]
fn season_without_mapping_keeps_images() {
    let mut system = mount("https://lodge.example/?topic=coast", &[]);
    system.apply(&Action::Season(Season::Winter));
    let snapshot = system.snapshot();
    assert_eq!(snapshot.topic, Some(slug("coast")));
    assert_eq!(snapshot.hero_src.as_deref(), Some("/img/coast-hero-s.jpg"));
    assert_eq!(snapshot.quote_src.as_deref(), Some("/img/coast-quote-s.jpg"));
    assert!(!snapshot.hero_transitioning);
}

#[test]
fn selections_after_season_switch_use_new_season() {
    let mut system = mount("https://lodge.example/", &[]);
    system.apply(&Action::Season(Season::Winter));
    system.apply(&Action::Topic("lakes".into()));
    let snapshot = system.snapshot();
    assert_eq!(snapshot.hero_src.as_deref(), Some("/img/lakes-hero-w.jpg"));
    assert_eq!(snapshot.quote_src.as_deref(), Some("/img/lakes-quote-w.jpg"));
    assert_eq!(gallery_state(&snapshot), (vec![slug("lakes")], Some(1)));

    // Swiping on the rebuilt carousel still moves the tabs.
    system.apply(&Action::Swipe { forward: false });
    assert_eq!(system.snapshot().gallery_tabs, [slug("alps")]);
}

// =========================================================================
// Initial selection from the URL
// =========================================================================

#[test]
fn url_topic_drives_every_widget_without_a_click() {
    let system = mount("https://lodge.example/?topic=lakes", &[]);
    let snapshot = system.snapshot();

    assert_eq!(
        snapshot.notifications,
        [TopicChange {
            topic: slug("lakes"),
            manual: false,
        }]
    );
    assert_eq!(snapshot.topic, Some(slug("lakes")));
    assert_eq!(snapshot.active_controls, ["lakes"]);
    assert_eq!(snapshot.hero_src.as_deref(), Some("/img/lakes-hero-s.jpg"));
    assert_eq!(snapshot.quote_src.as_deref(), Some("/img/lakes-quote-s.jpg"));
    assert_eq!(gallery_state(&snapshot), (vec![slug("lakes")], Some(2)));
    assert_eq!(snapshot.url_writes, 0);
    assert_eq!(snapshot.banner, None);
}

#[test]
fn url_topic_is_normalized() {
    let system = mount("https://lodge.example/?topic=Forest%20Trails", &[]);
    assert_eq!(system.snapshot().topic, Some(slug("forest-trails")));
}

// =========================================================================
// Image failures
// =========================================================================

#[test]
fn failed_hero_load_keeps_previous_image() {
    let mut system = mount("https://lodge.example/", &["/img/coast-hero-s.jpg"]);
    system.apply(&Action::Topic("coast".into()));

    let snapshot = system.snapshot();
    assert_eq!(snapshot.topic, Some(slug("coast")));
    assert_eq!(snapshot.hero_src.as_deref(), Some("/img/alps-hero-s.jpg"));
    assert!(!snapshot.hero_transitioning);
    // Other widgets are unaffected.
    assert_eq!(snapshot.quote_src.as_deref(), Some("/img/coast-quote-s.jpg"));

    // The guard was released: the next selection goes through.
    system.apply(&Action::Topic("lakes".into()));
    assert_eq!(system.snapshot().hero_src.as_deref(), Some("/img/lakes-hero-s.jpg"));
}

// =========================================================================
// Timing
// =========================================================================

#[test]
fn clicks_during_a_fade_are_dropped_by_the_hero_only() {
    let mut system = mount("https://lodge.example/", &[]);
    system.click_topic("lakes");
    system.click_topic("coast");
    system.run_until_idle();

    let snapshot = system.snapshot();
    assert_eq!(snapshot.topic, Some(slug("coast")));
    assert_eq!(snapshot.hero_src.as_deref(), Some("/img/lakes-hero-s.jpg"));
    assert_eq!(snapshot.quote_src.as_deref(), Some("/img/coast-quote-s.jpg"));
    assert_eq!(snapshot.gallery_tabs, [slug("coast")]);
}

#[test]
fn banner_shows_latest_manual_topic_until_hold_expires() {
    let mut system = mount("https://lodge.example/", &[]);
    system.click_topic("lakes");
    system.advance(Duration::from_millis(2000));
    system.click_topic("coast");
    system.advance(Duration::from_millis(1000));
    assert_eq!(system.snapshot().banner.as_deref(), Some("coast"));

    system.advance(Duration::from_millis(1700));
    assert_eq!(system.snapshot().banner, None);
}

// =========================================================================
// Non-ASCII labels
// =========================================================================

const ALPINE_CONTENT: &str = r#"
title = "Hütte am See"

[[topics]]
name = "Über uns"

[topics.summer]
images = ["/img/ueber-s1.jpg"]
hero = "/img/ueber-hero-s.jpg"

[[topics]]
name = "Öko Ferien"
gallery = "Ökologie"

[topics.summer]
images = ["/img/oeko-s1.jpg", "/img/oeko-s2.jpg"]
hero = "/img/oeko-hero-s.jpg"
quote = "/img/oeko-quote-s.jpg"
"#;

#[test]
fn non_ascii_topic_names_mount_and_select() {
    let mut system = mount_content(ALPINE_CONTENT, "https://lodge.example/", &[]);
    let slugs: Vec<&str> = system.topics().iter().map(|t| t.slug.as_str()).collect();
    assert_eq!(slugs, ["ber-uns", "ko-ferien"]);
    assert_eq!(system.topics()[1].display_name, "Öko Ferien");
    assert_eq!(system.snapshot().topic, Some(slug("ber-uns")));

    system.apply(&Action::Topic("Öko Ferien".into()));
    let snapshot = system.snapshot();
    assert_eq!(snapshot.topic, Some(slug("ko-ferien")));
    assert_eq!(snapshot.active_controls, ["ko-ferien"]);
    assert_eq!(snapshot.hero_src.as_deref(), Some("/img/oeko-hero-s.jpg"));
    assert_eq!(snapshot.quote_src.as_deref(), Some("/img/oeko-quote-s.jpg"));
    assert_eq!(gallery_state(&snapshot), (vec![slug("ko-ferien")], Some(1)));
    assert!(snapshot.url.contains("topic=ko-ferien"));

    let html = system.document().to_html();
    assert!(html.contains("Öko Ferien"));
    assert!(html.contains("Ökologie"));
}

#[test]
fn percent_encoded_non_ascii_url_topic_is_normalized() {
    let system = mount_content(
        ALPINE_CONTENT,
        "https://lodge.example/?topic=%C3%96ko%20Ferien",
        &[],
    );
    let snapshot = system.snapshot();
    assert_eq!(snapshot.topic, Some(slug("ko-ferien")));
    assert_eq!(snapshot.hero_src.as_deref(), Some("/img/oeko-hero-s.jpg"));
}
