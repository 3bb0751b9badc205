//! Shared types used across widgets, the CLI and the JSON snapshot output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The season axis, independent of topic selection.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    #[default]
    Summer,
    Winter,
}

impl Season {
    pub const ALL: [Season; 2] = [Season::Summer, Season::Winter];

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Summer => "summer",
            Season::Winter => "winter",
        }
    }

    /// The other season; what the navbar switch flips to.
    pub fn toggled(self) -> Season {
        match self {
            Season::Summer => Season::Winter,
            Season::Winter => Season::Summer,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::ALL
            .into_iter()
            .find(|season| season.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown season {s:?} (expected summer or winter)"))
    }
}

/// Every image a topic shows for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicImages {
    pub gallery_images: Vec<String>,
    pub hero_image: Option<String>,
    pub quote_image: Option<String>,
}
