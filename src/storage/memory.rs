//! In-memory record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{RecordStore, StorageError};
use crate::models::{
    LeaderboardEntry, NameChange, Player, PlayerCharacterRating, PlayerId, PlayerIdentity,
    PlayerRating, RatingLogEntry, Region, RosterEntry,
};

/// All tables held by a store.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub players: Vec<Player>,
    pub ratings: Vec<PlayerRating>,
    pub rating_log: Vec<RatingLogEntry>,
    pub character_ratings: Vec<PlayerCharacterRating>,
    pub name_history: Vec<NameChange>,
    pub roster: Vec<RosterEntry>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl Tables {
    fn next_rating_id(&self) -> u64 {
        self.ratings.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    fn username_taken(&self, username: &str, except: &PlayerIdentity) -> bool {
        self.players
            .iter()
            .any(|p| &p.identity != except && p.has_username(username))
    }

    fn player_mut(&mut self, identity: &PlayerIdentity) -> Result<&mut Player, StorageError> {
        self.players
            .iter_mut()
            .find(|p| &p.identity == identity)
            .ok_or_else(|| StorageError::NotFound {
                entity: "player",
                key: identity.to_string(),
            })
    }
}

/// Record store backed by in-process tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Copy of every table.
    pub async fn snapshot(&self) -> Tables {
        self.tables.read().await.clone()
    }

    /// Replace every table.
    pub async fn restore(&self, tables: Tables) {
        *self.tables.write().await = tables;
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_player(&self, identity: &PlayerIdentity) -> Result<Option<Player>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.players.iter().find(|p| &p.identity == identity).cloned())
    }

    async fn find_player_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Player>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .players
            .iter()
            .find(|p| p.has_username(username))
            .cloned())
    }

    async fn list_players(&self) -> Result<Vec<Player>, StorageError> {
        Ok(self.tables.read().await.players.clone())
    }

    async fn create_player(&self, player: &Player) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;

        if tables.players.iter().any(|p| p.identity == player.identity) {
            return Err(StorageError::UniqueViolation {
                entity: "player",
                key: player.identity.to_string(),
            });
        }
        if tables.username_taken(&player.username, &player.identity) {
            return Err(StorageError::UniqueViolation {
                entity: "player",
                key: player.username.to_lowercase(),
            });
        }

        debug!("Created player {}", player.identity);
        tables.players.push(player.clone());
        Ok(())
    }

    async fn update_player(&self, player: &Player) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;

        if tables.username_taken(&player.username, &player.identity) {
            return Err(StorageError::UniqueViolation {
                entity: "player",
                key: player.username.to_lowercase(),
            });
        }

        let stored = tables.player_mut(&player.identity)?;
        *stored = player.clone();
        Ok(())
    }

    async fn reassign_identity(
        &self,
        from: &PlayerIdentity,
        to: &PlayerId,
    ) -> Result<Player, StorageError> {
        let mut tables = self.tables.write().await;
        let target = PlayerIdentity::from(to.clone());

        if &target == from {
            return tables.player_mut(from).map(|p| p.clone());
        }
        if tables.players.iter().any(|p| p.identity == target) {
            return Err(StorageError::UniqueViolation {
                entity: "player",
                key: to.to_string(),
            });
        }

        let now = Utc::now();
        let player = tables.player_mut(from)?;
        player.identity = target.clone();
        player.updated_at = now;
        let player = player.clone();

        for rating in tables.ratings.iter_mut().filter(|r| &r.owner == from) {
            rating.owner = target.clone();
        }
        for row in tables.character_ratings.iter_mut().filter(|r| &r.owner == from) {
            row.owner = target.clone();
        }
        if let Some(old_id) = from.id() {
            for entry in tables.rating_log.iter_mut().filter(|e| &e.player_id == old_id) {
                entry.player_id = to.clone();
            }
            for change in tables.name_history.iter_mut().filter(|c| &c.user_id == old_id) {
                change.user_id = to.clone();
            }
        }

        debug!("Reassigned {} to {}", from, to);
        Ok(player)
    }

    async fn delete_player(&self, identity: &PlayerIdentity) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let before = tables.players.len();
        tables.players.retain(|p| &p.identity != identity);
        if tables.players.len() == before {
            return Err(StorageError::NotFound {
                entity: "player",
                key: identity.to_string(),
            });
        }

        tables.ratings.retain(|r| &r.owner != identity);
        tables.character_ratings.retain(|r| &r.owner != identity);
        if let Some(id) = identity.id() {
            tables.rating_log.retain(|e| &e.player_id != id);
            tables.name_history.retain(|c| &c.user_id != id);
        }
        Ok(())
    }

    async fn ratings(&self, owner: &PlayerIdentity) -> Result<Vec<PlayerRating>, StorageError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PlayerRating> = tables
            .ratings
            .iter()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn latest_rating(
        &self,
        owner: &PlayerIdentity,
    ) -> Result<Option<PlayerRating>, StorageError> {
        Ok(self.ratings(owner).await?.into_iter().next())
    }

    async fn insert_rating(
        &self,
        mut rating: PlayerRating,
    ) -> Result<Option<PlayerRating>, StorageError> {
        let mut tables = self.tables.write().await;

        let exists = tables
            .ratings
            .iter()
            .any(|r| r.owner == rating.owner && r.created_at == rating.created_at);
        if exists {
            return Ok(None);
        }

        rating.id = tables.next_rating_id();
        tables.ratings.push(rating.clone());
        Ok(Some(rating))
    }

    async fn patch_rating(
        &self,
        rating_id: u64,
        rank: Option<u32>,
        mastery_level: u32,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .ratings
            .iter_mut()
            .find(|r| r.id == rating_id)
            .ok_or_else(|| StorageError::NotFound {
                entity: "rating",
                key: rating_id.to_string(),
            })?;

        if let Some(rank) = rank {
            row.rank = rank;
        }
        row.mastery_level = mastery_level;
        Ok(())
    }

    async fn purge_ratings(&self, owner: &PlayerIdentity) -> Result<usize, StorageError> {
        let mut tables = self.tables.write().await;
        let before = tables.ratings.len();
        tables.ratings.retain(|r| &r.owner != owner);
        Ok(before - tables.ratings.len())
    }

    async fn latest_rating_log(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<RatingLogEntry>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rating_log
            .iter()
            .filter(|e| &e.player_id == player_id)
            .max_by_key(|e| e.timestamp)
            .cloned())
    }

    async fn append_rating_log(&self, entry: RatingLogEntry) -> Result<(), StorageError> {
        self.tables.write().await.rating_log.push(entry);
        Ok(())
    }

    async fn character_ratings(
        &self,
        owner: &PlayerIdentity,
    ) -> Result<Vec<PlayerCharacterRating>, StorageError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PlayerCharacterRating> = tables
            .character_ratings
            .iter()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }

    async fn insert_character_ratings(
        &self,
        rows: Vec<PlayerCharacterRating>,
    ) -> Result<usize, StorageError> {
        let mut tables = self.tables.write().await;
        let count = rows.len();
        for row in rows {
            replace_or_push(&mut tables.character_ratings, row);
        }
        Ok(count)
    }

    async fn upsert_character_rating(
        &self,
        row: PlayerCharacterRating,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        replace_or_push(&mut tables.character_ratings, row);
        Ok(())
    }

    async fn record_name_change(&self, change: NameChange) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .name_history
            .iter()
            .any(|c| c.user_id == change.user_id && c.changed_at == change.changed_at);
        if exists {
            return Ok(false);
        }
        tables.name_history.push(change);
        Ok(true)
    }

    async fn name_history(&self, user_id: &PlayerId) -> Result<Vec<NameChange>, StorageError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<NameChange> = tables
            .name_history
            .iter()
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.changed_at);
        Ok(rows)
    }

    async fn delete_name_history(
        &self,
        user_id: &PlayerId,
        changed_at: &[DateTime<Utc>],
    ) -> Result<usize, StorageError> {
        let mut tables = self.tables.write().await;
        let before = tables.name_history.len();
        tables
            .name_history
            .retain(|c| !(&c.user_id == user_id && changed_at.contains(&c.changed_at)));
        Ok(before - tables.name_history.len())
    }

    async fn add_roster_entry(&self, entry: RosterEntry) -> Result<(), StorageError> {
        self.tables.write().await.roster.push(entry);
        Ok(())
    }

    async fn unlinked_roster_entries(
        &self,
        user_id: &PlayerId,
    ) -> Result<Vec<RosterEntry>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .roster
            .iter()
            .filter(|e| &e.user_id == user_id && !e.is_linked())
            .cloned()
            .collect())
    }

    async fn link_roster_entry(
        &self,
        entry: &RosterEntry,
        player_id: &PlayerId,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .roster
            .iter_mut()
            .find(|e| {
                e.user_id == entry.user_id
                    && e.team_name == entry.team_name
                    && e.series == entry.series
                    && e.season == entry.season
            })
            .ok_or_else(|| StorageError::NotFound {
                entity: "roster entry",
                key: format!("{}@{}", entry.user_id, entry.team_name),
            })?;
        stored.linked_id = Some(player_id.clone());
        Ok(())
    }

    async fn clear_leaderboard(&self) -> Result<(), StorageError> {
        self.tables.write().await.leaderboard.clear();
        Ok(())
    }

    async fn insert_leaderboard_entry(&self, entry: LeaderboardEntry) -> Result<(), StorageError> {
        self.tables.write().await.leaderboard.push(entry);
        Ok(())
    }

    async fn leaderboard(&self, region: Region) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<LeaderboardEntry> = tables
            .leaderboard
            .iter()
            .filter(|e| e.region == region)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.rank);
        Ok(rows)
    }
}

fn replace_or_push(rows: &mut Vec<PlayerCharacterRating>, row: PlayerCharacterRating) {
    match rows
        .iter_mut()
        .find(|r| r.owner == row.owner && r.key == row.key)
    {
        Some(stored) => {
            stored.counters = row.counters;
            stored.updated_at = row.updated_at;
        }
        None => rows.push(row),
    }
}
