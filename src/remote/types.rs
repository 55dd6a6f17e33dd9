//! Remote stats service response types.
//!
//! Field names follow the service's camelCase JSON. Everything optional
//! upstream is optional here; missing collections default to empty.

use serde::{Deserialize, Serialize};

use crate::models::{PlayerId, RatingSnapshot, UNRANKED_RANK};

/// Discord binding reported on a player doc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordLink {
    pub discord_id: Option<String>,
    #[serde(default)]
    pub has_full_account: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformIds {
    pub discord: Option<DiscordLink>,
}

/// A player document as returned by the username query endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDoc {
    pub username: String,
    pub player_id: PlayerId,
    pub logo_id: Option<String>,
    pub title: Option<String>,
    pub nameplate_id: Option<String>,
    pub emoticon_id: Option<String>,
    pub title_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub platform_ids: PlatformIds,
    #[serde(default)]
    pub mastery_level: u32,
    pub player_status: Option<String>,
    pub social_url: Option<String>,
}

impl PlayerDoc {
    pub fn discord_id(&self) -> Option<&str> {
        self.platform_ids
            .discord
            .as_ref()
            .and_then(|d| d.discord_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MostPlayedCharacter {
    pub character_id: String,
    pub games_played: u32,
}

/// A leaderboard row: a player doc plus ranked counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    #[serde(flatten)]
    pub player: PlayerDoc,
    #[serde(default = "default_rank")]
    pub rank: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub games: u32,
    pub top_role: Option<String>,
    #[serde(default)]
    pub rating: u32,
    #[serde(default)]
    pub most_played_characters: Vec<MostPlayedCharacter>,
    pub current_division_id: Option<String>,
    pub progress_to_next: Option<f64>,
}

fn default_rank() -> u32 {
    UNRANKED_RANK
}

impl RankingEntry {
    pub fn snapshot(&self) -> RatingSnapshot {
        RatingSnapshot {
            rating: self.rating,
            rank: self.rank,
            games: self.games,
            wins: self.wins,
            losses: self.losses,
        }
    }

    /// Character with the most games, if any were reported.
    pub fn top_character(&self) -> Option<&str> {
        self.most_played_characters
            .iter()
            .max_by_key(|c| c.games_played)
            .map(|c| c.character_id.as_str())
    }
}

/// Response of the ranking search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingSearch {
    #[serde(default)]
    pub players: Vec<RankingEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(default)]
    pub start_index: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_items: u32,
}

/// One page of the regional leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    #[serde(default)]
    pub players: Vec<RankingEntry>,
    #[serde(default)]
    pub paging: Paging,
}

/// Account mastery progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryDoc {
    #[serde(default)]
    pub current_level: u32,
    #[serde(default)]
    pub current_level_xp: u64,
    #[serde(default)]
    pub xp_to_next_level: u64,
    #[serde(default)]
    pub total_xp: u64,
}

/// Cumulative counters for one role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStats {
    #[serde(default)]
    pub games: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub scores: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub saves: u32,
    #[serde(default)]
    pub knockouts: u32,
    #[serde(default)]
    pub mvp: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleStatsByRole {
    #[serde(rename = "Forward")]
    pub forward: Option<RoleStats>,
    #[serde(rename = "Goalie")]
    pub goalie: Option<RoleStats>,
}

/// Stats for one character in one rating bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterStat {
    pub character_id: String,
    pub rating_name: String,
    #[serde(default)]
    pub role_stats: RoleStatsByRole,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterStatsDoc {
    #[serde(default)]
    pub character_stats: Vec<CharacterStat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UsernameQueryResponse {
    #[serde(default)]
    pub matches: Vec<PlayerDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub jwt: String,
    pub refresh_token: String,
}
