//! Rating history models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PlayerId, PlayerIdentity};

/// Rank reported for players without a leaderboard placement.
pub const UNRANKED_RANK: u32 = 10_001;

/// A point-in-time ranked snapshot. Rows ordered by `created_at` descending
/// form a player's rating history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRating {
    /// Store-assigned row id
    pub id: u64,

    pub owner: PlayerIdentity,

    pub rating: u32,

    pub rank: u32,

    pub games: u32,

    pub wins: u32,

    pub losses: u32,

    pub mastery_level: u32,

    pub created_at: DateTime<Utc>,
}

impl PlayerRating {
    /// Build an unsaved row; the store assigns the id on insert.
    pub fn from_snapshot(
        owner: PlayerIdentity,
        snapshot: &RatingSnapshot,
        mastery_level: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            owner,
            rating: snapshot.rating,
            rank: snapshot.rank,
            games: snapshot.games,
            wins: snapshot.wins,
            losses: snapshot.losses,
            mastery_level,
            created_at,
        }
    }
}

/// The remote ranked state of a player at the time of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub rating: u32,
    pub rank: u32,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
}

impl RatingSnapshot {
    /// Snapshot used when no ranked region knows the player.
    pub fn unranked() -> Self {
        Self {
            rating: 0,
            rank: UNRANKED_RANK,
            games: 0,
            wins: 0,
            losses: 0,
        }
    }
}

/// Long-term rating-only history, deduplicated against its own latest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingLogEntry {
    pub player_id: PlayerId,
    pub username: Option<String>,
    pub rating: u32,
    pub timestamp: DateTime<Utc>,
}
