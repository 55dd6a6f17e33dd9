//! Per-character cumulative counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::PlayerIdentity;

/// Role a character was played in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Forward,
    Goalie,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Forward, Role::Goalie];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Forward => f.write_str("Forward"),
            Role::Goalie => f.write_str("Goalie"),
        }
    }
}

/// Upstream rating bucket name (e.g. `RankedInitial`, `NormalInitial`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gamemode(String);

impl Gamemode {
    /// Upstream marker for "no data".
    pub const NONE: &'static str = "None";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none_sentinel(&self) -> bool {
        self.0 == Self::NONE
    }
}

impl fmt::Display for Gamemode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Natural unique key of a character aggregate row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterKey {
    pub character: String,
    pub role: Role,
    pub gamemode: Gamemode,
}

/// Cumulative counters as reported upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCounters {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub scores: u32,
    pub assists: u32,
    pub saves: u32,
    pub knockouts: u32,
    pub mvp: u32,
}

/// Cumulative stats for one (player, character, role, gamemode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCharacterRating {
    pub owner: PlayerIdentity,

    #[serde(flatten)]
    pub key: CharacterKey,

    #[serde(flatten)]
    pub counters: CharacterCounters,

    /// When the counters were last replaced
    pub updated_at: DateTime<Utc>,
}
