//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (topic, widget) is shown by its identity first, a positional
//! index and its slug, with URLs and attributes as indented context lines.
//! The same topic reads the same way in `inspect` and `simulate` output.
//!
//! # Output Format
//!
//! ## Inspect
//!
//! ```text
//! Topics
//! 001 alps-lakes  Alps & Lakes
//!     Gallery tab: Alpine Lakes
//!     summer: 2 images, hero /img/alps-hero-s.jpg, quote /img/alps-quote-s.jpg
//!     winter: 1 image
//! 002 coast  Coast
//!     summer: 1 image
//!
//! 2 topics
//! ```
//!
//! ## Simulate
//!
//! ```text
//! Topic: coast (summer)
//!     URL: https://lodge.example/?topic=coast (1 write)
//!     Controls: coast
//!     Topic carousel: 1
//!     Gallery: coast, slide 2 of 3
//!     Hero: /img/coast-hero.jpg
//!     Quote: /img/coast-quote.jpg
//!     Banner: coast
//!     Season switch: aria-checked=true
//!
//! Notifications
//! 001 alps-lakes (initial)
//! 002 coast (manual)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function returning `Vec<String>` for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::content::Topic;
use crate::system::SystemSnapshot;
use crate::types::Season;

// ============================================================================
// Shared helpers
// ============================================================================

const INDENT: &str = "    ";

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("none")
}

// ============================================================================
// Inspect
// ============================================================================

fn season_line(topic: &Topic, season: Season) -> Option<String> {
    let images = topic.season_images(season).len();
    let hero = topic.hero_image(season);
    let quote = topic.quote_image(season);
    if images == 0 && hero.is_none() && quote.is_none() {
        return None;
    }
    let mut line = format!("{INDENT}{season}: {}", plural(images, "image", "images"));
    if let Some(hero) = hero {
        line.push_str(&format!(", hero {hero}"));
    }
    if let Some(quote) = quote {
        line.push_str(&format!(", quote {quote}"));
    }
    Some(line)
}

pub fn format_topics(topics: &[Topic]) -> Vec<String> {
    let mut lines = vec!["Topics".to_string()];
    for (i, topic) in topics.iter().enumerate() {
        lines.push(format!("{:03} {}  {}", i + 1, topic.slug, topic.display_name));
        if let Some(gallery) = &topic.gallery_name {
            lines.push(format!("{INDENT}Gallery tab: {gallery}"));
        }
        lines.extend(Season::ALL.into_iter().filter_map(|s| season_line(topic, s)));
    }
    lines.push(String::new());
    lines.push(plural(topics.len(), "topic", "topics"));
    lines
}

pub fn print_topics(topics: &[Topic]) {
    for line in format_topics(topics) {
        println!("{line}");
    }
}

// ============================================================================
// Simulate
// ============================================================================

pub fn format_snapshot(snapshot: &SystemSnapshot) -> Vec<String> {
    let topic = snapshot.topic.as_ref().map(|t| t.as_str());
    let mut lines = vec![format!("Topic: {} ({})", or_none(topic), snapshot.season)];

    lines.push(format!(
        "{INDENT}URL: {} ({})",
        snapshot.url,
        plural(snapshot.url_writes, "write", "writes")
    ));
    let controls = if snapshot.active_controls.is_empty() {
        "none".to_string()
    } else {
        snapshot.active_controls.join(", ")
    };
    lines.push(format!("{INDENT}Controls: {controls}"));
    if let Some(index) = snapshot.topic_carousel {
        lines.push(format!("{INDENT}Topic carousel: {index}"));
    }

    let tab = snapshot.gallery_tabs.first().map(|t| t.as_str());
    let gallery = match snapshot.gallery_carousel {
        Some(index) => format!(
            "{}, slide {} of {}",
            or_none(tab),
            index + 1,
            snapshot.gallery_slides
        ),
        None => format!("{}, no carousel", or_none(tab)),
    };
    lines.push(format!("{INDENT}Gallery: {gallery}"));

    let hero = or_none(snapshot.hero_src.as_deref());
    if snapshot.hero_transitioning {
        lines.push(format!("{INDENT}Hero: {hero} (fading)"));
    } else {
        lines.push(format!("{INDENT}Hero: {hero}"));
    }
    lines.push(format!("{INDENT}Quote: {}", or_none(snapshot.quote_src.as_deref())));
    lines.push(format!("{INDENT}Banner: {}", or_none(snapshot.banner.as_deref())));
    if let Some(state) = &snapshot.season_switch {
        lines.push(format!("{INDENT}Season switch: aria-checked={state}"));
    }

    lines.push(String::new());
    lines.push("Notifications".to_string());
    for (i, change) in snapshot.notifications.iter().enumerate() {
        let kind = if change.manual { "manual" } else { "initial" };
        lines.push(format!("{:03} {} ({kind})", i + 1, change.topic));
    }
    lines
}

pub fn print_snapshot(snapshot: &SystemSnapshot) {
    for line in format_snapshot(snapshot) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::TopicChange;
    use crate::slug::Slug;
    use std::collections::BTreeMap;

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    fn topic(name: &str, gallery: Option<&str>) -> Topic {
        Topic {
            slug: slug(name),
            display_name: name.to_string(),
            gallery_name: gallery.map(str::to_string),
            images: BTreeMap::new(),
            hero_images: BTreeMap::new(),
            quote_images: BTreeMap::new(),
        }
    }

    #[test]
    fn topics_list_seasons_that_have_content() {
        let mut alps = topic("Alps & Lakes", Some("Alpine Lakes"));
        alps.images
            .insert(Season::Summer, vec!["/a1.jpg".into(), "/a2.jpg".into()]);
        alps.hero_images.insert(Season::Summer, "/hero.jpg".into());
        alps.images.insert(Season::Winter, vec!["/w1.jpg".into()]);
        let lines = format_topics(&[alps, topic("Coast", None)]);
        assert_eq!(
            lines,
            vec![
                "Topics",
                "001 alps-lakes  Alps & Lakes",
                "    Gallery tab: Alpine Lakes",
                "    summer: 2 images, hero /hero.jpg",
                "    winter: 1 image",
                "002 coast  Coast",
                "",
                "2 topics",
            ]
        );
    }

    #[test]
    fn snapshot_lines() {
        let snapshot = SystemSnapshot {
            topic: Some(slug("coast")),
            season: Season::Winter,
            url: "https://lodge.example/?topic=coast".into(),
            url_writes: 1,
            notifications: vec![
                TopicChange {
                    topic: slug("alps"),
                    manual: false,
                },
                TopicChange {
                    topic: slug("coast"),
                    manual: true,
                },
            ],
            active_controls: vec!["coast".into()],
            topic_carousel: Some(1),
            gallery_carousel: Some(2),
            gallery_tabs: vec![slug("coast")],
            gallery_slides: 3,
            hero_src: Some("/coast-hero.jpg".into()),
            hero_transitioning: true,
            quote_src: None,
            banner: None,
            season_switch: Some("false".into()),
        };
        let lines = format_snapshot(&snapshot);
        assert_eq!(lines[0], "Topic: coast (winter)");
        assert_eq!(lines[1], "    URL: https://lodge.example/?topic=coast (1 write)");
        assert!(lines.contains(&"    Gallery: coast, slide 3 of 3".to_string()));
        assert!(lines.contains(&"    Hero: /coast-hero.jpg (fading)".to_string()));
        assert!(lines.contains(&"    Quote: none".to_string()));
        assert!(lines.contains(&"    Season switch: aria-checked=false".to_string()));
        assert_eq!(&lines[lines.len() - 2..], ["001 alps (initial)", "002 coast (manual)"]);
    }
}
