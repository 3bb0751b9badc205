//! Centralized topic slug normalization.
//!
//! Every component that compares topics (topic buttons, gallery tabs, gallery
//! slides, the `?topic=` query parameter, content entries) runs its input
//! through [`normalize`] first, so labels from different sources compare equal
//! regardless of casing or punctuation:
//!
//! - `"Alps & Lakes (Region)"` → `"alps-lakes-region"`
//! - `"  Hiking   Tours "` → `"hiking-tours"`
//! - `"Wellness/Spa!"` → `"wellnessspa"`
//!
//! The transformation is idempotent: `normalize(normalize(x)) == normalize(x)`.
//! Output only ever contains ASCII lowercase letters, digits, `_` and single
//! interior hyphens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical, URL- and attribute-safe topic identifier.
///
/// Only constructible through [`Slug::new`], so every `Slug` in the system has
/// already been normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Normalize `text` into a slug. Returns `None` when nothing survives.
    pub fn new(text: &str) -> Option<Slug> {
        let slug = normalize(text);
        if slug.is_empty() { None } else { Some(Slug(slug)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Slug {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Slug {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Convert a free-text label into its canonical slug.
///
/// Total over its input: `None` and `""` both yield `""`.
///
/// Steps, in order (the order matters for idempotence):
/// 1. lowercase and trim
/// 2. `" & "` becomes `"-"`
/// 3. parentheses are dropped
/// 4. anything that is not a word character, whitespace or `-` is dropped
/// 5. whitespace runs become a single `-`
/// 6. hyphen runs collapse to one
/// 7. leading/trailing hyphens are trimmed
pub fn normalize<'a>(text: impl Into<Option<&'a str>>) -> String {
    let Some(text) = text.into() else {
        return String::new();
    };

    let lowered = text.to_lowercase();
    let joined = lowered.trim().replace(" & ", "-");

    let mut out = String::with_capacity(joined.len());
    let mut in_whitespace = false;
    for c in joined.chars() {
        if is_space(c) {
            in_whitespace = true;
            continue;
        }
        if !is_word_char(c) && c != '-' {
            // Dropped characters do not break a whitespace run.
            continue;
        }
        if in_whitespace {
            push_hyphen(&mut out);
            in_whitespace = false;
        }
        if c == '-' {
            push_hyphen(&mut out);
        } else {
            out.push(c);
        }
    }
    if in_whitespace {
        push_hyphen(&mut out);
    }

    out.trim_matches('-').to_string()
}

/// Whitespace as the classic regex `\s` sees it, which includes the BOM.
fn is_space(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

/// ASCII word character (`[A-Za-z0-9_]`), matching the classic regex `\w`.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn push_hyphen(out: &mut String) {
    if !out.ends_with('-') {
        out.push('-');
    }
}
