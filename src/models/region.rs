//! Ranked regions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A ranked leaderboard region. `Global` spans all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Region {
    #[default]
    Global,
    NorthAmerica,
    SouthAmerica,
    Europe,
    Asia,
    Oceania,
    JapaneseLanguageText,
}

impl Region {
    /// Probe order used when no region hint is given.
    pub const PROBE_ORDER: [Region; 7] = [
        Region::Global,
        Region::NorthAmerica,
        Region::SouthAmerica,
        Region::Europe,
        Region::Asia,
        Region::Oceania,
        Region::JapaneseLanguageText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Global => "Global",
            Region::NorthAmerica => "NorthAmerica",
            Region::SouthAmerica => "SouthAmerica",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
            Region::Oceania => "Oceania",
            Region::JapaneseLanguageText => "JapaneseLanguageText",
        }
    }

    /// The value for the remote `specificRegion` parameter. Global is sent as
    /// no region at all.
    pub fn query_param(&self) -> Option<&'static str> {
        match self {
            Region::Global => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::PROBE_ORDER
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown region: {}", s))
    }
}
