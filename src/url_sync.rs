//! Mirrors the selected topic into the page's query string.
//!
//! One-way only: the query parameter seeds the initial selection at load and
//! is rewritten on every manual selection. Back/forward navigation is not
//! observed. Writes go through [`History::replace`], which never navigates.

use crate::slug::Slug;
use url::Url;

/// The page's location plus a record of non-navigating replacements.
#[derive(Debug, Clone)]
pub struct History {
    url: Url,
    replacements: usize,
}

impl History {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            replacements: 0,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Swap the current entry's URL without navigating.
    pub fn replace(&mut self, url: Url) {
        self.url = url;
        self.replacements += 1;
    }

    /// Number of replacements made since load.
    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

/// First value of `param` in the URL's query, if present and non-empty.
pub fn read_topic(url: &Url, param: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
}

/// Set `param` to `slug`, leaving every other query parameter untouched.
///
/// Returns `false` (and records nothing) when the URL already says so.
pub fn write_topic(history: &mut History, param: &str, slug: &Slug) -> bool {
    let mut pairs: Vec<(String, String)> = history
        .url()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut seen = false;
    pairs.retain_mut(|(key, value)| {
        if key.as_str() != param {
            return true;
        }
        if seen {
            return false;
        }
        seen = true;
        *value = slug.to_string();
        true
    });
    if !seen {
        pairs.push((param.to_string(), slug.to_string()));
    }

    let mut next = history.url().clone();
    next.query_pairs_mut().clear().extend_pairs(&pairs);

    if &next == history.url() {
        return false;
    }
    history.replace(next);
    true
}
