//! JSONL (JSON Lines) storage.
//!
//! Each table is one JSONL file under the tables directory; each line is one
//! row. `JsonlStore` keeps the tables in memory. New rows are appended to a
//! table's file; any other mutation rewrites the file through a temporary file
//! renamed over it.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::memory::{MemoryStore, Tables};
use super::{RecordStore, StorageConfig, StorageError};
use crate::models::{
    LeaderboardEntry, NameChange, Player, PlayerCharacterRating, PlayerId, PlayerIdentity,
    PlayerRating, RatingLogEntry, Region, RosterEntry,
};

/// Persisted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Players,
    Ratings,
    RatingLog,
    CharacterRatings,
    NameHistory,
    Roster,
    Leaderboard,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Players,
        Table::Ratings,
        Table::RatingLog,
        Table::CharacterRatings,
        Table::NameHistory,
        Table::Roster,
        Table::Leaderboard,
    ];

    /// Get the filename for this table.
    pub fn filename(&self) -> &'static str {
        match self {
            Table::Players => "players.jsonl",
            Table::Ratings => "player_ratings.jsonl",
            Table::RatingLog => "rating_history.jsonl",
            Table::CharacterRatings => "character_ratings.jsonl",
            Table::NameHistory => "name_history.jsonl",
            Table::Roster => "roster_entries.jsonl",
            Table::Leaderboard => "leaderboard.jsonl",
        }
    }
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn for_table(config: &StorageConfig, table: Table) -> Self {
        Self::new(config.table_path(table))
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append a single row to the file.
    pub fn append(&self, row: &T) -> Result<(), StorageError> {
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(row)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        debug!("Appended row to {:?}", self.path);
        Ok(())
    }

    /// Sibling path the next `write_all` is staged in.
    pub fn staging_path(&self) -> PathBuf {
        self.path.with_extension("jsonl.tmp")
    }

    /// Write rows, replacing the entire file. The old file stays in place
    /// until the new one is complete.
    pub fn write_all(&self, rows: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let staging = self.staging_path();
        let file = File::create(&staging)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for row in rows {
            let json = serde_json::to_string(row)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&staging, &self.path)?;
        debug!("Wrote {} rows to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn for_table(config: &StorageConfig, table: Table) -> Self {
        Self::new(config.table_path(table))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all rows, skipping lines that fail to parse.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", index + 1, self.path, e);
                }
            }
        }

        debug!("Read {} rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }
}

/// Record store persisted as one JSONL file per table.
pub struct JsonlStore {
    config: StorageConfig,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Load every table from disk. Missing files start empty.
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let tables = Self::load_tables(&config)?;

        info!(
            "Opened store at {:?}: {} players, {} ratings",
            config.tables_dir(),
            tables.players.len(),
            tables.ratings.len()
        );

        Ok(Self {
            config,
            inner: MemoryStore::from_tables(tables),
            write_lock: Mutex::new(()),
        })
    }

    fn load_tables(config: &StorageConfig) -> Result<Tables, StorageError> {
        Ok(Tables {
            players: JsonlReader::for_table(config, Table::Players).read_all()?,
            ratings: JsonlReader::for_table(config, Table::Ratings).read_all()?,
            rating_log: JsonlReader::for_table(config, Table::RatingLog).read_all()?,
            character_ratings: JsonlReader::for_table(config, Table::CharacterRatings)
                .read_all()?,
            name_history: JsonlReader::for_table(config, Table::NameHistory).read_all()?,
            roster: JsonlReader::for_table(config, Table::Roster).read_all()?,
            leaderboard: JsonlReader::for_table(config, Table::Leaderboard).read_all()?,
        })
    }

    /// Reload the in-memory tables from disk after a failed write.
    async fn roll_back(&self, cause: &StorageError) {
        warn!(
            "Write under {:?} failed, reloading tables from disk: {}",
            self.config.tables_dir(),
            cause
        );
        match Self::load_tables(&self.config) {
            Ok(tables) => self.inner.restore(tables).await,
            Err(e) => error!("Reloading tables failed, store is out of sync: {}", e),
        }
    }

    async fn append<T: Serialize>(&self, table: Table, row: &T) -> Result<(), StorageError> {
        if let Err(e) = JsonlWriter::for_table(&self.config, table).append(row) {
            self.roll_back(&e).await;
            return Err(e);
        }
        Ok(())
    }

    async fn persist(&self, dirty: &[Table]) -> Result<(), StorageError> {
        let tables = self.inner.snapshot().await;
        for table in dirty {
            match table {
                Table::Players => {
                    JsonlWriter::for_table(&self.config, *table).write_all(&tables.players)?
                }
                Table::Ratings => {
                    JsonlWriter::for_table(&self.config, *table).write_all(&tables.ratings)?
                }
                Table::RatingLog => {
                    JsonlWriter::for_table(&self.config, *table).write_all(&tables.rating_log)?
                }
                Table::CharacterRatings => JsonlWriter::for_table(&self.config, *table)
                    .write_all(&tables.character_ratings)?,
                Table::NameHistory => {
                    JsonlWriter::for_table(&self.config, *table).write_all(&tables.name_history)?
                }
                Table::Roster => {
                    JsonlWriter::for_table(&self.config, *table).write_all(&tables.roster)?
                }
                Table::Leaderboard => {
                    JsonlWriter::for_table(&self.config, *table).write_all(&tables.leaderboard)?
                }
            };
        }
        Ok(())
    }
}

/// Run a mutation on the inner store and rewrite the tables it touched.
/// When the rewrite fails the inner store is reloaded from disk.
macro_rules! mutate {
    ($self:ident, [$($table:expr),+], $call:expr) => {{
        let _guard = $self.write_lock.lock().await;
        let result = $call.await?;
        if let Err(e) = $self.persist(&[$($table),+]).await {
            $self.roll_back(&e).await;
            return Err(e);
        }
        Ok(result)
    }};
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn find_player(&self, identity: &PlayerIdentity) -> Result<Option<Player>, StorageError> {
        self.inner.find_player(identity).await
    }

    async fn find_player_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Player>, StorageError> {
        self.inner.find_player_by_username(username).await
    }

    async fn list_players(&self) -> Result<Vec<Player>, StorageError> {
        self.inner.list_players().await
    }

    async fn create_player(&self, player: &Player) -> Result<(), StorageError> {
        mutate!(self, [Table::Players], self.inner.create_player(player))
    }

    async fn update_player(&self, player: &Player) -> Result<(), StorageError> {
        mutate!(self, [Table::Players], self.inner.update_player(player))
    }

    async fn reassign_identity(
        &self,
        from: &PlayerIdentity,
        to: &PlayerId,
    ) -> Result<Player, StorageError> {
        mutate!(
            self,
            [
                Table::Players,
                Table::Ratings,
                Table::CharacterRatings,
                Table::RatingLog,
                Table::NameHistory
            ],
            self.inner.reassign_identity(from, to)
        )
    }

    async fn delete_player(&self, identity: &PlayerIdentity) -> Result<(), StorageError> {
        mutate!(
            self,
            [
                Table::Players,
                Table::Ratings,
                Table::CharacterRatings,
                Table::RatingLog,
                Table::NameHistory
            ],
            self.inner.delete_player(identity)
        )
    }

    async fn ratings(&self, owner: &PlayerIdentity) -> Result<Vec<PlayerRating>, StorageError> {
        self.inner.ratings(owner).await
    }

    async fn latest_rating(
        &self,
        owner: &PlayerIdentity,
    ) -> Result<Option<PlayerRating>, StorageError> {
        self.inner.latest_rating(owner).await
    }

    async fn insert_rating(
        &self,
        rating: PlayerRating,
    ) -> Result<Option<PlayerRating>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let inserted = self.inner.insert_rating(rating).await?;
        if let Some(row) = &inserted {
            self.append(Table::Ratings, row).await?;
        }
        Ok(inserted)
    }

    async fn patch_rating(
        &self,
        rating_id: u64,
        rank: Option<u32>,
        mastery_level: u32,
    ) -> Result<(), StorageError> {
        mutate!(
            self,
            [Table::Ratings],
            self.inner.patch_rating(rating_id, rank, mastery_level)
        )
    }

    async fn purge_ratings(&self, owner: &PlayerIdentity) -> Result<usize, StorageError> {
        mutate!(self, [Table::Ratings], self.inner.purge_ratings(owner))
    }

    async fn latest_rating_log(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<RatingLogEntry>, StorageError> {
        self.inner.latest_rating_log(player_id).await
    }

    async fn append_rating_log(&self, entry: RatingLogEntry) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.inner.append_rating_log(entry.clone()).await?;
        self.append(Table::RatingLog, &entry).await
    }

    async fn character_ratings(
        &self,
        owner: &PlayerIdentity,
    ) -> Result<Vec<PlayerCharacterRating>, StorageError> {
        self.inner.character_ratings(owner).await
    }

    async fn insert_character_ratings(
        &self,
        rows: Vec<PlayerCharacterRating>,
    ) -> Result<usize, StorageError> {
        mutate!(
            self,
            [Table::CharacterRatings],
            self.inner.insert_character_ratings(rows)
        )
    }

    async fn upsert_character_rating(
        &self,
        row: PlayerCharacterRating,
    ) -> Result<(), StorageError> {
        mutate!(
            self,
            [Table::CharacterRatings],
            self.inner.upsert_character_rating(row)
        )
    }

    async fn record_name_change(&self, change: NameChange) -> Result<bool, StorageError> {
        mutate!(
            self,
            [Table::NameHistory],
            self.inner.record_name_change(change)
        )
    }

    async fn name_history(&self, user_id: &PlayerId) -> Result<Vec<NameChange>, StorageError> {
        self.inner.name_history(user_id).await
    }

    async fn delete_name_history(
        &self,
        user_id: &PlayerId,
        changed_at: &[DateTime<Utc>],
    ) -> Result<usize, StorageError> {
        mutate!(
            self,
            [Table::NameHistory],
            self.inner.delete_name_history(user_id, changed_at)
        )
    }

    async fn add_roster_entry(&self, entry: RosterEntry) -> Result<(), StorageError> {
        mutate!(self, [Table::Roster], self.inner.add_roster_entry(entry))
    }

    async fn unlinked_roster_entries(
        &self,
        user_id: &PlayerId,
    ) -> Result<Vec<RosterEntry>, StorageError> {
        self.inner.unlinked_roster_entries(user_id).await
    }

    async fn link_roster_entry(
        &self,
        entry: &RosterEntry,
        player_id: &PlayerId,
    ) -> Result<(), StorageError> {
        mutate!(
            self,
            [Table::Roster],
            self.inner.link_roster_entry(entry, player_id)
        )
    }

    async fn clear_leaderboard(&self) -> Result<(), StorageError> {
        mutate!(self, [Table::Leaderboard], self.inner.clear_leaderboard())
    }

    async fn insert_leaderboard_entry(&self, entry: LeaderboardEntry) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.inner.insert_leaderboard_entry(entry.clone()).await?;
        self.append(Table::Leaderboard, &entry).await
    }

    async fn leaderboard(&self, region: Region) -> Result<Vec<LeaderboardEntry>, StorageError> {
        self.inner.leaderboard(region).await
    }
}
