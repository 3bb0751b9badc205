//! Site configuration module.
//!
//! Handles loading, validating, and merging the site's `config.toml`. Stock
//! defaults match the markup the site ships with; a user file overrides only
//! the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! default_season = "summer"   # Season shown before the switch is touched
//! query_param = "topic"       # Query parameter mirroring the selected topic
//!
//! [timing]
//! hero_fade_ms = 200          # Hero fade-out before the image swaps
//! banner_hold_ms = 2700       # How long the topic banner stays visible
//!
//! [selectors]
//! hero_image = ".hero_img"    # Every DOM anchor is a compound selector
//! # ...
//!
//! [carousels.topic]
//! slides_per_view = 2.5
//! space_between = 0
//!
//! [[carousels.topic.breakpoints]]
//! min_width = 768
//! slides_per_view = 4.0
//! ```
//!
//! Unknown keys are rejected to catch typos early. Selectors are validated
//! while parsing, so a malformed selector is a TOML error pointing at its key.

use crate::dom::Selector;
use crate::types::Season;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Season active at page load.
    pub default_season: Season,
    /// Query parameter carrying the selected topic slug.
    pub query_param: String,
    /// Delays for presentation effects.
    pub timing: TimingConfig,
    /// DOM anchors every widget looks up.
    pub selectors: Selectors,
    /// Carousel widget settings.
    pub carousels: CarouselsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            default_season: Season::Summer,
            query_param: "topic".to_string(),
            timing: TimingConfig::default(),
            selectors: Selectors::default(),
            carousels: CarouselsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_param.trim().is_empty() {
            return Err(ConfigError::Validation(
                "query_param must not be empty".into(),
            ));
        }
        for (name, carousel) in [
            ("topic", &self.carousels.topic),
            ("gallery", &self.carousels.gallery),
        ] {
            if carousel.slides_per_view <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "carousels.{name}.slides_per_view must be positive"
                )));
            }
            if carousel
                .breakpoints
                .iter()
                .any(|b| b.slides_per_view.is_some_and(|v| v <= 0.0))
            {
                return Err(ConfigError::Validation(format!(
                    "carousels.{name}.breakpoints slides_per_view must be positive"
                )));
            }
        }
        Ok(())
    }
}

/// Presentation delays, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Hero fade-out duration before the new image is swapped in.
    pub hero_fade_ms: u64,
    /// Total time the topic banner stays on screen.
    pub banner_hold_ms: u64,
}

impl TimingConfig {
    pub fn hero_fade(&self) -> Duration {
        Duration::from_millis(self.hero_fade_ms)
    }

    pub fn banner_hold(&self) -> Duration {
        Duration::from_millis(self.banner_hold_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hero_fade_ms: 200,
            banner_hold_ms: 2700,
        }
    }
}

/// Built-in selectors are known-valid literals.
fn builtin(selector: &str) -> Selector {
    Selector::parse(selector).expect("built-in selector must parse")
}

/// DOM anchors. A missing anchor disables the widget that needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Selectors {
    /// Container holding the embedded topic content.
    pub content_source: Selector,
    /// One element per topic inside the content source.
    pub topic_entry: Selector,
    /// Season-tagged image group inside a topic entry.
    pub season_gallery: Selector,
    /// Image URL carrier inside a season group.
    pub gallery_image: Selector,
    /// Template cloned once per topic for the topic list.
    pub topic_template: Selector,
    /// Clickable topic control.
    pub topic_control: Selector,
    /// Topic carousel container.
    pub topic_carousel: Selector,
    /// Topic carousel slide wrapper (ARIA tablist).
    pub topic_wrapper: Selector,
    /// Any carousel slide.
    pub carousel_slide: Selector,
    /// Gallery tab template / collection item.
    pub gallery_tab_item: Selector,
    /// Clickable gallery tab.
    pub gallery_tab: Selector,
    /// Gallery image slide template.
    pub gallery_slide: Selector,
    /// Gallery carousel container.
    pub gallery_carousel: Selector,
    /// Hero image element.
    pub hero_image: Selector,
    /// Quote image element.
    pub quote_image: Selector,
    /// Quote video element; its presence disables the quote image widget.
    pub quote_video: Selector,
    /// Season switch container in the navbar.
    pub season_switch: Selector,
    /// The `role=switch` control inside the season switch.
    pub switch_control: Selector,
    /// Topic banner element.
    pub banner: Selector,
    /// Text element inside the banner.
    pub banner_text: Selector,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            content_source: builtin(".data-source"),
            topic_entry: builtin("[data-topic-name]"),
            season_gallery: builtin(".images-gallery"),
            gallery_image: builtin("[data-img-url]"),
            topic_template: builtin("[data-topic-template]"),
            topic_control: builtin(".topic_button[data-topic]"),
            topic_carousel: builtin(".swiper.is-topic"),
            topic_wrapper: builtin(".swiper-wrapper.is-topic"),
            carousel_slide: builtin(".swiper-slide"),
            gallery_tab_item: builtin(".gallery_tabs-collection-item"),
            gallery_tab: builtin(".gallery_tabs"),
            gallery_slide: builtin(".swiper-slide.is-gallery"),
            gallery_carousel: builtin(".swiper.is-gallery"),
            hero_image: builtin(".hero_img"),
            quote_image: builtin("[data-quote-image]"),
            quote_video: builtin("[data-quote-video]"),
            season_switch: builtin(".navbar_season-switch"),
            switch_control: builtin("[role=switch]"),
            banner: builtin(".topic_banner"),
            banner_text: builtin("#topic-banner-text"),
        }
    }
}

/// Settings for both carousels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarouselsConfig {
    pub topic: CarouselConfig,
    pub gallery: CarouselConfig,
}

impl Default for CarouselsConfig {
    fn default() -> Self {
        Self {
            topic: CarouselConfig {
                slides_per_view: 2.5,
                space_between: 0,
                rewind: true,
                centered_slides: false,
                initial_slide: 0,
                speed_ms: None,
                navigation: NavigationConfig {
                    next: builtin(".topic_next-btn"),
                    prev: builtin(".topic_prev-btn"),
                },
                keyboard: KeyboardConfig::default(),
                breakpoints: vec![
                    Breakpoint::slides(389, 3.5),
                    Breakpoint::slides(480, 3.0),
                    Breakpoint::slides(768, 4.0),
                ],
            },
            gallery: CarouselConfig {
                slides_per_view: 1.2,
                space_between: 16,
                rewind: true,
                centered_slides: false,
                initial_slide: 0,
                speed_ms: Some(700),
                navigation: NavigationConfig {
                    next: builtin(".gallery_next-btn"),
                    prev: builtin(".gallery_prev-btn"),
                },
                keyboard: KeyboardConfig::default(),
                breakpoints: vec![
                    Breakpoint {
                        min_width: 480,
                        slides_per_view: Some(2.2),
                        space_between: Some(16),
                        centered_slides: Some(false),
                        initial_slide: Some(0),
                    },
                    Breakpoint {
                        min_width: 992,
                        slides_per_view: Some(2.0),
                        space_between: Some(32),
                        centered_slides: Some(true),
                        initial_slide: Some(1),
                    },
                ],
            },
        }
    }
}

/// Configuration handed to the carousel widget on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarouselConfig {
    pub slides_per_view: f64,
    pub space_between: u32,
    #[serde(default)]
    pub rewind: bool,
    #[serde(default)]
    pub centered_slides: bool,
    #[serde(default)]
    pub initial_slide: usize,
    /// Transition speed; `None` keeps the widget's own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_ms: Option<u32>,
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub keyboard: KeyboardConfig,
    /// Width-keyed overrides; every breakpoint at or below the viewport
    /// width applies, narrowest first.
    #[serde(default)]
    pub breakpoints: Vec<Breakpoint>,
}

impl CarouselConfig {
    /// The effective configuration at a given viewport width.
    pub fn resolve(&self, viewport_width: u32) -> CarouselConfig {
        let mut applicable: Vec<&Breakpoint> = self
            .breakpoints
            .iter()
            .filter(|b| b.min_width <= viewport_width)
            .collect();
        applicable.sort_by_key(|b| b.min_width);

        let mut resolved = self.clone();
        for b in applicable {
            if let Some(v) = b.slides_per_view {
                resolved.slides_per_view = v;
            }
            if let Some(v) = b.space_between {
                resolved.space_between = v;
            }
            if let Some(v) = b.centered_slides {
                resolved.centered_slides = v;
            }
            if let Some(v) = b.initial_slide {
                resolved.initial_slide = v;
            }
        }
        resolved.breakpoints.clear();
        resolved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavigationConfig {
    pub next: Selector,
    pub prev: Selector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyboardConfig {
    pub enabled: bool,
    pub only_in_viewport: bool,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            only_in_viewport: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Breakpoint {
    pub min_width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slides_per_view: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_between: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centered_slides: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_slide: Option<usize>,
}

impl Breakpoint {
    fn slides(min_width: u32, slides_per_view: f64) -> Self {
        Self {
            min_width,
            slides_per_view: Some(slides_per_view),
            space_between: None,
            centered_slides: None,
            initial_slide: None,
        }
    }
}

// =============================================================================
// Reading a site's config.toml
// =============================================================================

/// The stock page setup (selectors, carousel options, timings) as a TOML
/// table, ready to have a site's `config.toml` laid over it.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Lay a site's settings over the stock ones.
///
/// `[selectors]`, `[carousels]` and `[timing]` merge key by key, so a site
/// that renames one class keeps every other stock selector. Scalars and
/// arrays in `overlay` replace the stock value outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a site's `config.toml` without interpreting it.
///
/// `Ok(None)` when there is no such file: the page then runs on stock
/// selectors and timings.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Build the [`SiteConfig`] from the stock table and the site's settings, if
/// any. Fails when a key is unknown, a selector does not parse or the result
/// does not pass [`SiteConfig::validate`].
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// The site config at `path`, on top of the stock page setup.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// A commented `config.toml` listing every selector, carousel option and
/// timing with its stock value. Printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# topic-sync configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Season shown at page load ("summer" or "winter").
default_season = "summer"

# Query parameter that mirrors the selected topic (?topic=<slug>).
query_param = "topic"

# ---------------------------------------------------------------------------
# Timing (milliseconds)
# ---------------------------------------------------------------------------
[timing]
# Hero image fade-out before the new image is swapped in.
hero_fade_ms = 200

# How long the topic banner stays on screen after a manual selection.
banner_hold_ms = 2700

# ---------------------------------------------------------------------------
# DOM anchors
# ---------------------------------------------------------------------------
# Each value is one compound selector: tag, .class, #id, [attr], [attr=value].
# A widget whose anchor is missing from the page disables itself.
[selectors]
content_source = ".data-source"
topic_entry = "[data-topic-name]"
season_gallery = ".images-gallery"
gallery_image = "[data-img-url]"
topic_template = "[data-topic-template]"
topic_control = ".topic_button[data-topic]"
topic_carousel = ".swiper.is-topic"
topic_wrapper = ".swiper-wrapper.is-topic"
carousel_slide = ".swiper-slide"
gallery_tab_item = ".gallery_tabs-collection-item"
gallery_tab = ".gallery_tabs"
gallery_slide = ".swiper-slide.is-gallery"
gallery_carousel = ".swiper.is-gallery"
hero_image = ".hero_img"
quote_image = "[data-quote-image]"
quote_video = "[data-quote-video]"
season_switch = ".navbar_season-switch"
switch_control = "[role=switch]"
banner = ".topic_banner"
banner_text = "#topic-banner-text"

# ---------------------------------------------------------------------------
# Topic carousel
# ---------------------------------------------------------------------------
[carousels.topic]
slides_per_view = 2.5
space_between = 0
rewind = true
navigation = { next = ".topic_next-btn", prev = ".topic_prev-btn" }
keyboard = { enabled = true, only_in_viewport = true }

# Overrides applied at and above min_width (pixels).
[[carousels.topic.breakpoints]]
min_width = 389
slides_per_view = 3.5

[[carousels.topic.breakpoints]]
min_width = 480
slides_per_view = 3.0

[[carousels.topic.breakpoints]]
min_width = 768
slides_per_view = 4.0

# ---------------------------------------------------------------------------
# Gallery carousel
# ---------------------------------------------------------------------------
[carousels.gallery]
slides_per_view = 1.2
space_between = 16
rewind = true
speed_ms = 700
navigation = { next = ".gallery_next-btn", prev = ".gallery_prev-btn" }
keyboard = { enabled = true, only_in_viewport = true }

[[carousels.gallery.breakpoints]]
min_width = 480
slides_per_view = 2.2
space_between = 16
centered_slides = false
initial_slide = 0

[[carousels.gallery.breakpoints]]
min_width = 992
slides_per_view = 2.0
space_between = 32
centered_slides = true
initial_slide = 1
"##
}
