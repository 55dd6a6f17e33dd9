//! Record persistence.
//!
//! `RecordStore` is the seam the sync layer writes through. Every write is
//! keyed by a natural unique constraint so concurrent resolutions of the same
//! player converge instead of duplicating rows:
//! - players: identity, and username case-insensitively
//! - ratings: (owner, created_at)
//! - character ratings: (owner, character, role, gamemode)
//! - name history: (user id, changed_at minute)

pub mod jsonl;
pub mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    LeaderboardEntry, NameChange, Player, PlayerCharacterRating, PlayerId, PlayerIdentity,
    PlayerRating, RatingLogEntry, Region, RosterEntry,
};

pub use jsonl::{JsonlReader, JsonlStore, JsonlWriter, Table};
pub use memory::MemoryStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unique constraint violated on {entity}: {key}")]
    UniqueViolation { entity: &'static str, key: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

impl StorageError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StorageError::UniqueViolation { .. })
    }
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join("tables")
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.tables_dir().join(table.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Persistence for players and everything they own.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_player(&self, identity: &PlayerIdentity) -> Result<Option<Player>, StorageError>;

    /// Case-insensitive username lookup.
    async fn find_player_by_username(&self, username: &str)
        -> Result<Option<Player>, StorageError>;

    async fn list_players(&self) -> Result<Vec<Player>, StorageError>;

    /// Fails with `UniqueViolation` if the identity or the username is taken.
    async fn create_player(&self, player: &Player) -> Result<(), StorageError>;

    /// Replace a stored player, matched by identity.
    async fn update_player(&self, player: &Player) -> Result<(), StorageError>;

    /// Give the player at `from` the canonical id `to`, moving every row it
    /// owns. Fails with `UniqueViolation` if `to` already belongs to someone.
    async fn reassign_identity(
        &self,
        from: &PlayerIdentity,
        to: &PlayerId,
    ) -> Result<Player, StorageError>;

    /// Delete a player and the rows it owns.
    async fn delete_player(&self, identity: &PlayerIdentity) -> Result<(), StorageError>;

    /// Rating history, newest first.
    async fn ratings(&self, owner: &PlayerIdentity) -> Result<Vec<PlayerRating>, StorageError>;

    async fn latest_rating(&self, owner: &PlayerIdentity)
        -> Result<Option<PlayerRating>, StorageError>;

    /// Insert unless a row with the same owner and `created_at` exists.
    /// Returns the stored row with its assigned id, or `None` if skipped.
    async fn insert_rating(&self, rating: PlayerRating)
        -> Result<Option<PlayerRating>, StorageError>;

    /// Patch rank (when given) and mastery level of an existing row.
    async fn patch_rating(
        &self,
        rating_id: u64,
        rank: Option<u32>,
        mastery_level: u32,
    ) -> Result<(), StorageError>;

    async fn purge_ratings(&self, owner: &PlayerIdentity) -> Result<usize, StorageError>;

    async fn latest_rating_log(&self, player_id: &PlayerId)
        -> Result<Option<RatingLogEntry>, StorageError>;

    async fn append_rating_log(&self, entry: RatingLogEntry) -> Result<(), StorageError>;

    async fn character_ratings(
        &self,
        owner: &PlayerIdentity,
    ) -> Result<Vec<PlayerCharacterRating>, StorageError>;

    /// Batch insert. A row whose key already exists replaces the stored
    /// counters.
    async fn insert_character_ratings(
        &self,
        rows: Vec<PlayerCharacterRating>,
    ) -> Result<usize, StorageError>;

    /// Replace the counters stored under the row's key, inserting if absent.
    async fn upsert_character_rating(&self, row: PlayerCharacterRating)
        -> Result<(), StorageError>;

    /// Insert unless the (user, minute) key exists. Returns whether inserted.
    async fn record_name_change(&self, change: NameChange) -> Result<bool, StorageError>;

    async fn name_history(&self, user_id: &PlayerId) -> Result<Vec<NameChange>, StorageError>;

    async fn delete_name_history(
        &self,
        user_id: &PlayerId,
        changed_at: &[DateTime<Utc>],
    ) -> Result<usize, StorageError>;

    async fn add_roster_entry(&self, entry: RosterEntry) -> Result<(), StorageError>;

    /// Roster entries naming `user_id` that are not linked to a player yet.
    async fn unlinked_roster_entries(
        &self,
        user_id: &PlayerId,
    ) -> Result<Vec<RosterEntry>, StorageError>;

    async fn link_roster_entry(
        &self,
        entry: &RosterEntry,
        player_id: &PlayerId,
    ) -> Result<(), StorageError>;

    async fn clear_leaderboard(&self) -> Result<(), StorageError>;

    async fn insert_leaderboard_entry(&self, entry: LeaderboardEntry) -> Result<(), StorageError>;

    /// Leaderboard rows for a region, best rank first.
    async fn leaderboard(&self, region: Region) -> Result<Vec<LeaderboardEntry>, StorageError>;
}
