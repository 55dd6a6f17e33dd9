//! Folding ghost records into canonical players.
//!
//! A ghost is a player cached under a username before its remote id was
//! known. Once the id is observed the ghost is either promoted in place or,
//! when a canonical record already exists under that id, its rating history
//! is copied over and the ghost is dropped.

use tracing::{info, warn};

use super::apply_username;
use crate::models::{Player, PlayerIdentity};
use crate::remote::PlayerDoc;
use crate::storage::{RecordStore, StorageError};

/// Merge `ghost` into the record for `doc.player_id`.
///
/// Safe to repeat and safe against a concurrent merge of the same ghost:
/// rating copies are keyed by `created_at` and a ghost that is already gone
/// is not an error.
pub async fn merge_ghost(
    store: &dyn RecordStore,
    ghost: &Player,
    doc: &PlayerDoc,
) -> Result<Player, StorageError> {
    warn!(
        "Ghost profile '{}' resolved to {}, merging",
        ghost.username, doc.player_id
    );

    let canonical_identity = PlayerIdentity::from(doc.player_id.clone());
    if let Some(canonical) = store.find_player(&canonical_identity).await? {
        if canonical.identity != ghost.identity {
            return union_into(store, ghost, canonical, doc).await;
        }
    }

    match store.reassign_identity(&ghost.identity, &doc.player_id).await {
        Ok(promoted) => {
            info!("Promoted ghost '{}' to {}", ghost.username, doc.player_id);
            apply_username(store, promoted, &doc.username).await
        }
        Err(e) if e.is_unique_violation() => {
            // Canonical record appeared since the lookup above
            let canonical = store
                .find_player(&canonical_identity)
                .await?
                .ok_or(e)?;
            union_into(store, ghost, canonical, doc).await
        }
        Err(StorageError::NotFound { entity, key }) => {
            // Ghost already merged by another resolution
            match store.find_player(&canonical_identity).await? {
                Some(canonical) => apply_username(store, canonical, &doc.username).await,
                None => Err(StorageError::NotFound { entity, key }),
            }
        }
        Err(e) => Err(e),
    }
}

async fn union_into(
    store: &dyn RecordStore,
    ghost: &Player,
    canonical: Player,
    doc: &PlayerDoc,
) -> Result<Player, StorageError> {
    let mut copied = 0;
    for mut rating in store.ratings(&ghost.identity).await? {
        rating.owner = canonical.identity.clone();
        if store.insert_rating(rating).await?.is_some() {
            copied += 1;
        }
    }

    match store.delete_player(&ghost.identity).await {
        Ok(()) | Err(StorageError::NotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    info!(
        "Merged ghost '{}' into {} ({} ratings copied)",
        ghost.username, canonical.identity, copied
    );
    apply_username(store, canonical, &doc.username).await
}
