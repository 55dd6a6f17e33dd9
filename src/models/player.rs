//! Cached player record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PlayerCharacterRating, PlayerId, PlayerIdentity, PlayerRating, Region};

/// Cosmetic asset references shown on a player's card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cosmetics {
    pub emoticon_id: Option<String>,
    pub logo_id: Option<String>,
    pub title_id: Option<String>,
    pub nameplate_id: Option<String>,
}

/// A cached player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Canonical id or ghost marker
    pub identity: PlayerIdentity,

    /// Case-preserving; compared case-insensitively
    pub username: String,

    pub region: Region,

    #[serde(default)]
    pub cosmetics: Cosmetics,

    pub social_url: Option<String>,

    pub discord_id: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// XP into the current mastery level
    pub current_xp: Option<u64>,

    pub status: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Player {
    /// Create a resolved player with no profile data yet.
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        Self::with_identity(PlayerIdentity::from(id), username.into())
    }

    /// Create a ghost placeholder for a username seen before its id.
    pub fn ghost(username: impl Into<String>) -> Self {
        let username = username.into();
        Self::with_identity(PlayerIdentity::ghost(&username), username)
    }

    fn with_identity(identity: PlayerIdentity, username: String) -> Self {
        let now = Utc::now();
        Self {
            identity,
            username,
            region: Region::Global,
            cosmetics: Cosmetics::default(),
            social_url: None,
            discord_id: None,
            tags: Vec::new(),
            current_xp: None,
            status: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn id(&self) -> Option<&PlayerId> {
        self.identity.id()
    }

    pub fn is_ghost(&self) -> bool {
        self.identity.is_ghost()
    }

    /// Records created by the leaderboard crawl never get cosmetics filled in.
    pub fn is_incomplete(&self) -> bool {
        self.cosmetics.emoticon_id.is_none()
    }

    /// Case-insensitive username match.
    pub fn has_username(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }
}

/// A player together with the history the resolver reasons about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player: Player,

    /// Newest first
    pub ratings: Vec<PlayerRating>,

    pub character_ratings: Vec<PlayerCharacterRating>,
}

impl PlayerProfile {
    pub fn latest_rating(&self) -> Option<&PlayerRating> {
        self.ratings.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ghost_player() {
        let player = Player::ghost("Nova");
        assert!(player.is_ghost());
        assert_eq!(player.username, "Nova");
        assert_eq!(player.identity, PlayerIdentity::ghost("nova"));
        assert!(player.id().is_none());
    }

    #[test]
    fn test_has_username_ignores_case() {
        let player = Player::new(PlayerId::from("P1"), "Zed1");
        assert!(player.has_username("zed1"));
        assert!(player.has_username("ZED1"));
        assert!(!player.has_username("Zed2"));
    }

    #[test]
    fn test_new_player_is_incomplete() {
        let mut player = Player::new(PlayerId::from("P1"), "Zed1");
        assert!(player.is_incomplete());

        player.cosmetics.emoticon_id = Some("E_Smile".to_string());
        assert!(!player.is_incomplete());
    }

    #[test]
    fn test_player_serialization() {
        let player = Player::new(PlayerId::from("P1"), "Zed1").with_region(Region::Europe);
        let json = serde_json::to_string(&player).unwrap();
        let parsed: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, player);
    }
}
