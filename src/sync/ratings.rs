//! Rating history appends.
//!
//! A new row is only written when the rating itself moves. Rank drifts as
//! peers play, so a rank-only change patches the latest row in place.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{PlayerId, PlayerIdentity, PlayerRating, RatingLogEntry, RatingSnapshot};
use crate::storage::{RecordStore, StorageError};

/// What `append_or_patch` did to the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new row was written.
    Inserted(PlayerRating),
    /// Same rating, new rank: the latest row's rank and mastery were patched.
    RankPatched,
    /// Same rating and rank: only the latest row's mastery level was patched.
    MasteryPatched,
    /// Nothing differed.
    Unchanged,
    /// A concurrent writer already stored a row at the same timestamp.
    Duplicate,
}

impl AppendOutcome {
    pub fn inserted(&self) -> bool {
        matches!(self, AppendOutcome::Inserted(_))
    }
}

/// Append a snapshot or patch the latest row, whichever applies.
pub async fn append_or_patch(
    store: &dyn RecordStore,
    owner: &PlayerIdentity,
    snapshot: &RatingSnapshot,
    mastery_level: u32,
    now: DateTime<Utc>,
) -> Result<AppendOutcome, StorageError> {
    if let Some(latest) = store.latest_rating(owner).await? {
        if latest.rating == snapshot.rating {
            if latest.rank != snapshot.rank {
                store
                    .patch_rating(latest.id, Some(snapshot.rank), mastery_level)
                    .await?;
                debug!(
                    "{} rank {} -> {} at rating {}",
                    owner, latest.rank, snapshot.rank, latest.rating
                );
                return Ok(AppendOutcome::RankPatched);
            }
            if latest.mastery_level != mastery_level {
                store.patch_rating(latest.id, None, mastery_level).await?;
                return Ok(AppendOutcome::MasteryPatched);
            }
            return Ok(AppendOutcome::Unchanged);
        }
    }

    insert(store, owner, snapshot, mastery_level, now).await
}

/// Leaderboard variant: insert only when there is no history or the rating
/// moved. Rank changes are left alone.
pub async fn append_if_changed(
    store: &dyn RecordStore,
    owner: &PlayerIdentity,
    snapshot: &RatingSnapshot,
    mastery_level: u32,
    now: DateTime<Utc>,
) -> Result<AppendOutcome, StorageError> {
    match store.latest_rating(owner).await? {
        Some(latest) if latest.rating == snapshot.rating => Ok(AppendOutcome::Unchanged),
        _ => insert(store, owner, snapshot, mastery_level, now).await,
    }
}

async fn insert(
    store: &dyn RecordStore,
    owner: &PlayerIdentity,
    snapshot: &RatingSnapshot,
    mastery_level: u32,
    now: DateTime<Utc>,
) -> Result<AppendOutcome, StorageError> {
    let row = PlayerRating::from_snapshot(owner.clone(), snapshot, mastery_level, now);
    match store.insert_rating(row).await? {
        Some(stored) => {
            debug!("{} new rating {} (#{})", owner, stored.rating, stored.rank);
            Ok(AppendOutcome::Inserted(stored))
        }
        None => {
            warn!("{} already has a rating at {}", owner, now);
            Ok(AppendOutcome::Duplicate)
        }
    }
}

/// Append to the long-term rating log unless its newest entry has the same
/// rating. Returns whether an entry was written.
pub async fn log_rating(
    store: &dyn RecordStore,
    player_id: &PlayerId,
    username: Option<&str>,
    rating: u32,
    now: DateTime<Utc>,
) -> Result<bool, StorageError> {
    if let Some(last) = store.latest_rating_log(player_id).await? {
        if last.rating == rating {
            return Ok(false);
        }
    }

    store
        .append_rating_log(RatingLogEntry {
            player_id: player_id.clone(),
            username: username.map(str::to_string),
            rating,
            timestamp: now,
        })
        .await?;
    debug!("Logged rating {} for {}", rating, player_id);
    Ok(true)
}
