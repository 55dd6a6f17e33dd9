//! Leaderboard repopulation.
//!
//! Rebuilds the leaderboard table from the remote ranked boards and keeps
//! every listed player's identity and rating history current. Regions and
//! pages are walked one at a time with a pause between players to stay
//! inside upstream rate limits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::BatchReport;
use crate::config::JobConfig;
use crate::models::{tier_for_rating, winrate, LeaderboardEntry, Region};
use crate::remote::RankingEntry;
use crate::sync::reconcile::{discord_change, ProfileDiff};
use crate::sync::resolver::Adoption;
use crate::sync::{ratings, PlayerSync, SyncError};

/// What happened to one leaderboard player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryResult {
    Created,
    Updated,
    Unchanged,
    Corrupt,
}

pub struct LeaderboardJob {
    sync: Arc<PlayerSync>,
    config: JobConfig,
}

impl LeaderboardJob {
    pub fn new(sync: Arc<PlayerSync>, config: JobConfig) -> Self {
        Self { sync, config }
    }

    /// Clear the leaderboard table and repopulate every configured region.
    ///
    /// Only a failure to clear the table is returned as an error; page and
    /// player failures are counted in the report.
    pub async fn run(&self) -> Result<BatchReport, SyncError> {
        let start = Instant::now();
        self.sync.store().clear_leaderboard().await?;

        let mut report = BatchReport::default();
        for &region in &self.config.regions {
            self.run_region(region, &mut report).await;
        }
        report.duration = start.elapsed();

        info!(
            "Leaderboard updated: {} processed, {} created, {} updated, {} skipped, {} failed in {:?}",
            report.processed,
            report.created,
            report.updated,
            report.skipped,
            report.failed,
            report.duration
        );
        Ok(report)
    }

    async fn run_region(&self, region: Region, report: &mut BatchReport) {
        let page_size = self.config.page_size;
        let mut offset = 0;

        loop {
            info!(
                "Updating leaderboard for {} (offset {}, step {})",
                region, offset, page_size
            );
            let page = match self
                .sync
                .provider()
                .leaderboard_page(offset, page_size, region)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!("Leaderboard page {} @ {} failed: {}", offset, region, e);
                    report.errors.push(format!("{} page {}: {}", region, offset, e));
                    return;
                }
            };

            for entry in &page.players {
                if entry.rank > self.config.max_rank {
                    info!("Reached rank {} in {}, stopping", self.config.max_rank, region);
                    return;
                }

                report.processed += 1;
                debug!(
                    "({}) Updating {} #{} @ {}",
                    report.processed, entry.player.player_id, entry.rank, region
                );

                match self.process_entry(entry, region, Utc::now()).await {
                    Ok(EntryResult::Created) => report.created += 1,
                    Ok(EntryResult::Updated) => report.updated += 1,
                    Ok(EntryResult::Unchanged) => report.skipped += 1,
                    Ok(EntryResult::Corrupt) => report.record_failure(format!(
                        "{} ({}): id mismatch",
                        entry.player.username, entry.player.player_id
                    )),
                    Err(e) => {
                        error!(
                            "Error updating {} #{} @ {}: {}",
                            entry.player.player_id, entry.rank, region, e
                        );
                        report.record_failure(format!("{}: {}", entry.player.player_id, e));
                    }
                }

                if self.config.item_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.item_delay_ms)).await;
                }
            }

            if page.players.is_empty() || page.paging.total_items <= offset + page_size {
                return;
            }
            offset += page_size;
        }
    }

    async fn process_entry(
        &self,
        entry: &RankingEntry,
        region: Region,
        now: DateTime<Utc>,
    ) -> Result<EntryResult, SyncError> {
        let store = self.sync.store();
        let doc = &entry.player;

        store
            .insert_leaderboard_entry(LeaderboardEntry {
                player_id: doc.player_id.clone(),
                username: doc.username.clone(),
                region,
                rank: entry.rank,
                rating: entry.rating,
                rank_name: tier_for_rating(entry.rating).name.to_string(),
                top_role: entry.top_role.clone(),
                top_character: entry.top_character().map(str::to_string),
                wins: entry.wins,
                losses: entry.losses,
                winrate: winrate(entry.wins, entry.games),
                mastery_level: doc.mastery_level,
                recorded_at: now,
            })
            .await?;

        let (mut player, created) = match self.sync.adopt(doc, None, region, None).await? {
            Adoption::Created(player) => (player, true),
            Adoption::Existing { player, .. } => (player, false),
            Adoption::Corrupt(_) => return Ok(EntryResult::Corrupt),
        };

        let snapshot = entry.snapshot();
        let appended = ratings::append_if_changed(
            store.as_ref(),
            &player.identity,
            &snapshot,
            doc.mastery_level,
            now,
        )
        .await?;

        let mut changed = appended.inserted();
        if let Some(change) = discord_change(&player, doc) {
            info!("Discord linked for '{}'", player.username);
            ProfileDiff {
                changes: vec![change],
            }
            .apply(&mut player);
            player.updated_at = now;
            store.update_player(&player).await?;
            changed = true;
        }

        if let Some(id) = player.id() {
            let logged =
                ratings::log_rating(store.as_ref(), id, Some(&player.username), entry.rating, now);
            if let Err(e) = logged.await {
                warn!("Error logging rating for {}: {}", id, e);
            }
        }

        Ok(match (created, changed) {
            (true, _) => EntryResult::Created,
            (false, true) => EntryResult::Updated,
            (false, false) => EntryResult::Unchanged,
        })
    }
}
