//! External roster entries and leaderboard rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PlayerId, Region};

/// A team roster slot imported from an esports source. `user_id` is the
/// remote id the source listed; `linked_id` is set once a cached player with
/// that id exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user_id: PlayerId,
    pub team_name: String,
    pub series: String,
    pub season: String,
    pub linked_id: Option<PlayerId>,
}

impl RosterEntry {
    pub fn is_linked(&self) -> bool {
        self.linked_id.is_some()
    }
}

/// One row of the regional leaderboard table, rebuilt by the leaderboard job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub username: String,
    pub region: Region,
    pub rank: u32,
    pub rating: u32,
    pub rank_name: String,
    pub top_role: Option<String>,
    pub top_character: Option<String>,
    pub wins: u32,
    pub losses: u32,
    /// Percentage with one decimal
    pub winrate: f64,
    pub mastery_level: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Win percentage rounded to one decimal; zero when no games were played.
pub fn winrate(wins: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    let pct = f64::from(wins) / f64::from(games) * 100.0;
    (pct * 10.0).round() / 10.0
}
