//! Page scaffold.
//!
//! Builds a complete page from a `content.toml` file: the hidden data source
//! plus every template and anchor the widgets look for under the stock
//! selectors. Used by the `scaffold` command and as the starting document for
//! `inspect` and `simulate` when no HTML page is given.
//!
//! ```toml
//! title = "Valley Lodge"
//! quote_video = false
//!
//! [[topics]]
//! name = "Alps & Lakes"
//! gallery = "Alpine Lakes"        # Optional gallery tab label
//!
//! [topics.summer]
//! images = ["/img/alps-s1.jpg", "/img/alps-s2.jpg"]
//! hero = "/img/alps-hero-s.jpg"
//! quote = "/img/alps-quote-s.jpg"
//!
//! [topics.winter]
//! images = ["/img/alps-w1.jpg"]
//! ```
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.

use crate::types::Season;
use maud::{DOCTYPE, Markup, html};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentFile {
    pub title: Option<String>,
    /// Present the quote as a video instead of a swappable image.
    pub quote_video: bool,
    pub topics: Vec<TopicEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopicEntry {
    pub name: String,
    pub gallery: Option<String>,
    pub summer: SeasonEntry,
    pub winter: SeasonEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeasonEntry {
    pub images: Vec<String>,
    pub hero: Option<String>,
    pub quote: Option<String>,
}

impl TopicEntry {
    pub fn season(&self, season: Season) -> &SeasonEntry {
        match season {
            Season::Summer => &self.summer,
            Season::Winter => &self.winter,
        }
    }
}

impl ContentFile {
    pub fn parse(src: &str) -> Result<Self, ContentFileError> {
        Ok(toml::from_str(src)?)
    }

    pub fn load(path: &Path) -> Result<Self, ContentFileError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// First hero or quote URL the page should start with.
    fn first_url(&self, season: Season, pick: impl Fn(&SeasonEntry) -> Option<&String>) -> String {
        self.topics
            .iter()
            .find_map(|t| pick(t.season(season)))
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// Page
// ============================================================================

/// The full page for `season` as a string.
pub fn page_html(content: &ContentFile, season: Season) -> String {
    render_page(content, season).into_string()
}

pub fn render_page(content: &ContentFile, season: Season) -> Markup {
    let title = content.title.as_deref().unwrap_or("Gallery");
    let hero = content.first_url(season, |s| s.hero.as_ref());
    let quote = content.first_url(season, |s| s.quote.as_ref());
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) }
            }
            body {
                header.navbar {
                    div.navbar_season-switch {
                        div role="switch" aria-checked=(if season == Season::Summer { "true" } else { "false" }) {}
                    }
                }
                section.hero {
                    img.hero_img.scaleup src=(hero) alt="";
                }
                (topic_list())
                (gallery(content, season))
                section.quote {
                    @if content.quote_video {
                        video data-quote-video {}
                    } @else {
                        img data-quote-image src=(quote) alt="";
                    }
                }
                div.topic_banner style="display: none" {
                    span id="topic-banner-text" {}
                }
                (data_source(content))
            }
        }
    }
}

fn topic_list() -> Markup {
    html! {
        nav.topics {
            div.swiper.is-topic {
                div.swiper-wrapper.is-topic {
                    div.swiper-slide data-topic-template {
                        a.topic_button data-topic="" { p { "Topic" } }
                    }
                }
            }
            button.topic_prev-btn { "Previous" }
            button.topic_next-btn { "Next" }
        }
    }
}

fn gallery(content: &ContentFile, season: Season) -> Markup {
    let placeholder = content
        .topics
        .iter()
        .find_map(|t| t.season(season).images.first())
        .map(String::as_str)
        .unwrap_or("");
    html! {
        section.gallery {
            div.gallery_tabs-collection-list {
                div.gallery_tabs-collection-item role="tab" {
                    p.gallery_tabs { "Gallery" }
                }
            }
            div.swiper.is-gallery {
                div.swiper-wrapper.is-gallery {
                    div.swiper-slide.is-gallery {
                        img.gallery_img src=(placeholder) alt="";
                    }
                }
            }
            button.gallery_prev-btn { "Previous" }
            button.gallery_next-btn { "Next" }
        }
    }
}

fn data_source(content: &ContentFile) -> Markup {
    html! {
        div.data-source style="display: none" {
            @for topic in &content.topics {
                div data-topic-name=(topic.name) data-gallery-name=[topic.gallery.as_deref()] {
                    @for season in Season::ALL {
                        @let entry = topic.season(season);
                        @if !entry.images.is_empty() {
                            div.images-gallery data-season=(season.as_str()) {
                                @for url in &entry.images {
                                    div data-img-url=(url) {}
                                }
                            }
                        }
                    }
                    @if let Some(url) = &topic.summer.hero { div data-hero-summer-img=(url) {} }
                    @if let Some(url) = &topic.winter.hero { div data-hero-winter-img=(url) {} }
                    @if let Some(url) = &topic.summer.quote { div data-quote-summer-img=(url) {} }
                    @if let Some(url) = &topic.winter.quote { div data-quote-winter-img=(url) {} }
                }
            }
        }
    }
}
