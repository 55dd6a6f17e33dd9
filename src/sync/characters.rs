//! Per-character aggregate sync.
//!
//! Upstream reports cumulative totals, so rows are replaced wholesale and
//! never incremented.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{
    CharacterCounters, CharacterKey, Gamemode, PlayerCharacterRating, PlayerIdentity, Role,
};
use crate::remote::{CharacterStat, CharacterStatsDoc, RoleStats};
use crate::storage::{RecordStore, StorageError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterSyncReport {
    /// Rows written by the batch insert
    pub inserted: usize,
    /// Existing rows whose counters were replaced
    pub replaced: usize,
    /// Upstream stats under the "None" gamemode
    pub skipped_sentinel: usize,
    /// Role entries missing from an upstream stat
    pub invalid: usize,
}

impl From<RoleStats> for CharacterCounters {
    fn from(stats: RoleStats) -> Self {
        Self {
            games: stats.games,
            wins: stats.wins,
            losses: stats.losses,
            scores: stats.scores,
            assists: stats.assists,
            saves: stats.saves,
            knockouts: stats.knockouts,
            mvp: stats.mvp,
        }
    }
}

fn role_stats(stat: &CharacterStat, role: Role) -> Option<RoleStats> {
    match role {
        Role::Forward => stat.role_stats.forward,
        Role::Goalie => stat.role_stats.goalie,
    }
}

/// Replace the player's aggregates with the upstream totals.
///
/// Keys missing locally go in one batch; keys already stored are replaced one
/// by one through the unique key.
pub async fn sync_character_aggregates(
    store: &dyn RecordStore,
    owner: &PlayerIdentity,
    stats: &CharacterStatsDoc,
    now: DateTime<Utc>,
) -> Result<CharacterSyncReport, StorageError> {
    let existing: HashSet<CharacterKey> = store
        .character_ratings(owner)
        .await?
        .into_iter()
        .map(|row| row.key)
        .collect();

    let mut report = CharacterSyncReport::default();
    let mut seen = HashSet::new();
    let mut inserts = Vec::new();
    let mut updates = Vec::new();

    for stat in &stats.character_stats {
        let gamemode = Gamemode::new(stat.rating_name.as_str());
        if gamemode.is_none_sentinel() {
            report.skipped_sentinel += 1;
            continue;
        }

        for role in Role::ALL {
            let Some(counters) = role_stats(stat, role) else {
                warn!(
                    "Skipping {} {} {} for {}: no role stats",
                    stat.character_id, role, gamemode, owner
                );
                report.invalid += 1;
                continue;
            };

            let key = CharacterKey {
                character: stat.character_id.clone(),
                role,
                gamemode: gamemode.clone(),
            };
            if !seen.insert(key.clone()) {
                continue;
            }

            let row = PlayerCharacterRating {
                owner: owner.clone(),
                key,
                counters: counters.into(),
                updated_at: now,
            };
            if existing.contains(&row.key) {
                updates.push(row);
            } else {
                inserts.push(row);
            }
        }
    }

    if !inserts.is_empty() {
        report.inserted = store.insert_character_ratings(inserts).await?;
    }
    for row in updates {
        store.upsert_character_rating(row).await?;
        report.replaced += 1;
    }

    debug!(
        "Character sync for {}: {} inserted, {} replaced",
        owner, report.inserted, report.replaced
    );
    Ok(report)
}
