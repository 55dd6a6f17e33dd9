//! Player identity and stats sync.
//!
//! `PlayerSync::resolve` is the single entry point used by the CLI and the
//! leaderboard job:
//! 1. Look the player up in the record store
//! 2. Return the cached copy if the caller trusts the cache
//! 3. Resolve remote truth through the strategy chain
//! 4. Create, merge or repair the local record
//! 5. Skip writes if the cache is fresh, else append ratings and replace
//!    character aggregates

pub mod characters;
pub mod freshness;
pub mod ghost;
pub mod ratings;
pub mod reconcile;
pub mod resolver;
pub mod strategy;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Player, PlayerId, PlayerIdentity, PlayerProfile, Region};
use crate::remote::StatsProvider;
use crate::storage::{RecordStore, StorageError};

/// Errors that abort a sync operation.
///
/// Remote failures inside a resolution are reported through
/// `ResolveOutcome::TransientUpstream` instead; these variants cover the
/// local store and callers that talk to the provider directly.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(#[from] crate::remote::RemoteError),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),
}

/// What to resolve: a username, a canonical id, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerQuery {
    pub username: Option<String>,
    pub id: Option<PlayerId>,
}

impl PlayerQuery {
    pub fn username(name: impl Into<String>) -> Self {
        Self {
            username: Some(name.into()),
            id: None,
        }
    }

    pub fn id(id: impl Into<PlayerId>) -> Self {
        Self {
            username: None,
            id: Some(id.into()),
        }
    }

    /// Classify free-form input: 24 hex digits is an id, anything else a
    /// username.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if PlayerId::looks_like_id(input) {
            Self::id(input)
        } else {
            Self::username(input)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self
                .username
                .as_deref()
                .map_or(true, |name| name.trim().is_empty())
    }
}

impl std::fmt::Display for PlayerQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.username, &self.id) {
            (Some(name), Some(id)) => write!(f, "'{}' ({})", name, id),
            (Some(name), None) => write!(f, "'{}'", name),
            (None, Some(id)) => write!(f, "{}", id),
            (None, None) => f.write_str("<empty>"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Return a cached record without contacting the remote service.
    pub trust_cache: bool,

    /// Region to probe first instead of the full probe order.
    pub region_hint: Option<Region>,
}

/// How the returned profile came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Served from the store without remote calls.
    Cached,
    /// First sighting; the record was created.
    Created,
    /// Remote state matched the cache; no stats were written.
    Unchanged,
    /// Stats were refreshed.
    Updated,
}

/// An id mismatch that could not be repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchReport {
    pub username: String,
    pub cached_id: PlayerId,
    pub remote_id: PlayerId,
    pub detected_at: DateTime<Utc>,
}

/// Result of a resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Resolved {
        profile: PlayerProfile,
        disposition: Disposition,
    },
    /// Unknown locally and remotely.
    NotFound,
    /// The cached id disagrees with the remote one and the repair failed.
    DataCorruption(MismatchReport),
    /// Every remote strategy failed.
    TransientUpstream(String),
}

impl ResolveOutcome {
    pub fn profile(&self) -> Option<&PlayerProfile> {
        match self {
            ResolveOutcome::Resolved { profile, .. } => Some(profile),
            _ => None,
        }
    }

    pub fn disposition(&self) -> Option<Disposition> {
        match self {
            ResolveOutcome::Resolved { disposition, .. } => Some(*disposition),
            _ => None,
        }
    }
}

/// Reconciles cached players against the remote stats service.
pub struct PlayerSync {
    provider: Arc<dyn StatsProvider>,
    store: Arc<dyn RecordStore>,
}

impl PlayerSync {
    pub fn new(provider: Arc<dyn StatsProvider>, store: Arc<dyn RecordStore>) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn StatsProvider> {
        &self.provider
    }

    /// Load a player with its rating history and character aggregates.
    pub async fn load_profile(&self, player: Player) -> Result<PlayerProfile, SyncError> {
        let (ratings, character_ratings) = tokio::try_join!(
            self.store.ratings(&player.identity),
            self.store.character_ratings(&player.identity),
        )?;
        Ok(PlayerProfile {
            player,
            ratings,
            character_ratings,
        })
    }

    /// Create a ghost record for a username seen before its id is known.
    pub async fn seed_ghost(&self, username: &str) -> Result<Player, SyncError> {
        let ghost = Player::ghost(username.trim());
        self.store.create_player(&ghost).await?;
        info!("Seeded ghost profile for '{}'", ghost.username);
        Ok(ghost)
    }

    /// Delete every rating row of a player.
    pub async fn purge_ratings(&self, id: &PlayerId) -> Result<usize, SyncError> {
        let identity = PlayerIdentity::from(id.clone());
        if self.store.find_player(&identity).await?.is_none() {
            return Err(SyncError::PlayerNotFound(id.to_string()));
        }
        let removed = self.store.purge_ratings(&identity).await?;
        info!("Purged {} rating rows for {}", removed, id);
        Ok(removed)
    }

    /// Delete name-history rows of a user at the given timestamps.
    pub async fn delete_name_history(
        &self,
        id: &PlayerId,
        changed_at: &[DateTime<Utc>],
    ) -> Result<usize, SyncError> {
        let removed = self.store.delete_name_history(id, changed_at).await?;
        info!("Deleted {} name history rows for {}", removed, id);
        Ok(removed)
    }
}

/// Store `username` on the player. A name held by another record is left
/// alone and the player is returned unchanged.
pub(crate) async fn apply_username(
    store: &dyn RecordStore,
    player: Player,
    username: &str,
) -> Result<Player, StorageError> {
    if player.username == username {
        return Ok(player);
    }

    let mut renamed = player.clone();
    renamed.username = username.to_string();
    renamed.updated_at = Utc::now();

    match store.update_player(&renamed).await {
        Ok(()) => Ok(renamed),
        Err(e) if e.is_unique_violation() => {
            warn!(
                "Could not rename {} from '{}' to '{}': {}",
                player.identity, player.username, username, e
            );
            Ok(player)
        }
        Err(e) => Err(e),
    }
}
