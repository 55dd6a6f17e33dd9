//! Player resolution.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::reconcile::{self, IdentityDrift};
use super::strategy::{self, ChainOutcome};
use super::{
    apply_username, characters, freshness, ghost, ratings, Disposition, MismatchReport,
    PlayerQuery, PlayerSync, ResolveOptions, ResolveOutcome, SyncError,
};
use crate::models::{NameChange, Player, PlayerIdentity, RatingSnapshot, Region};
use crate::remote::{ensure_region, MasteryDoc, PlayerDoc};

/// The local record a remote doc was matched to.
#[derive(Debug)]
pub enum Adoption {
    Existing { player: Player, was_ghost: bool },
    Created(Player),
    Corrupt(MismatchReport),
}

impl PlayerSync {
    /// Resolve a player against the cache and the remote service.
    ///
    /// `Err` is only returned for local storage failures; every remote
    /// outcome is reported through `ResolveOutcome`.
    pub async fn resolve(
        &self,
        query: &PlayerQuery,
        options: ResolveOptions,
    ) -> Result<ResolveOutcome, SyncError> {
        if query.is_empty() {
            return Ok(ResolveOutcome::NotFound);
        }

        let cached = self.lookup(query).await?;

        if options.trust_cache {
            if let Some(player) = cached {
                debug!("Serving {} from cache", query);
                let profile = self.load_profile(player).await?;
                return Ok(ResolveOutcome::Resolved {
                    profile,
                    disposition: Disposition::Cached,
                });
            }
        }

        let chain = strategy::plan(query.username.as_deref(), query.id.as_ref(), cached.as_ref());
        let doc = match strategy::run_chain(self.provider.as_ref(), &chain).await {
            ChainOutcome::Found(doc) => doc,
            ChainOutcome::NotFound => {
                info!("No remote player for {}", query);
                return Ok(ResolveOutcome::NotFound);
            }
            ChainOutcome::Unavailable(reason) => {
                warn!("Remote lookups for {} all failed: {}", query, reason);
                return Ok(ResolveOutcome::TransientUpstream(reason));
            }
        };

        let region_hint = options
            .region_hint
            .or_else(|| cached.as_ref().map(|p| p.region));
        let (ensured, mastery) = tokio::join!(
            ensure_region(self.provider.as_ref(), &doc.player_id, region_hint),
            self.provider.fetch_mastery(&doc.player_id),
        );
        let mastery = match mastery {
            Ok(mastery) => mastery,
            Err(e) => {
                warn!("Mastery lookup for {} failed: {}", doc.player_id, e);
                return Ok(ResolveOutcome::TransientUpstream(e.to_string()));
            }
        };
        let region = ensured.as_ref().map_or(Region::Global, |e| e.region);
        let ranking = ensured.as_ref().map(|e| &e.entry);

        let (player, created) = match self.adopt(&doc, cached, region, Some(&mastery)).await? {
            Adoption::Corrupt(report) => return Ok(ResolveOutcome::DataCorruption(report)),
            Adoption::Created(player) => (player, true),
            Adoption::Existing { player, was_ghost } => {
                let profile = self.load_profile(player).await?;
                let is_ghost = was_ghost || profile.player.is_incomplete();
                if freshness::should_skip_update(&profile, &mastery, ranking, is_ghost) {
                    info!("Stats for '{}' unchanged since last update", profile.player.username);
                    return Ok(ResolveOutcome::Resolved {
                        profile,
                        disposition: Disposition::Unchanged,
                    });
                }
                (profile.player, false)
            }
        };

        info!("Updating profile of '{}'", player.username);
        let now = Utc::now();

        let mut player = player;
        let diff = reconcile::profile_diff(&player, &doc, Some(&mastery), Some(region));
        if !diff.is_empty() {
            debug!("{} changed fields: {:?}", player.identity, diff.fields());
            diff.apply(&mut player);
            player.updated_at = now;
            self.store.update_player(&player).await?;
        }

        let snapshot = ranking.map_or_else(RatingSnapshot::unranked, |e| e.snapshot());
        let appended = ratings::append_or_patch(
            self.store.as_ref(),
            &player.identity,
            &snapshot,
            mastery.current_level,
            now,
        )
        .await?;
        if appended.inserted() {
            if let Some(id) = player.id() {
                ratings::log_rating(
                    self.store.as_ref(),
                    id,
                    Some(&player.username),
                    snapshot.rating,
                    now,
                )
                .await?;
            }
        }

        match self.provider.fetch_character_stats(&doc.player_id).await {
            Ok(stats) => {
                characters::sync_character_aggregates(
                    self.store.as_ref(),
                    &player.identity,
                    &stats,
                    now,
                )
                .await?;
            }
            Err(e) => warn!("Character stats for {} unavailable: {}", doc.player_id, e),
        }

        if created {
            self.link_roster(&player).await;
        }

        let player = self
            .store
            .find_player(&player.identity)
            .await?
            .unwrap_or(player);
        let profile = self.load_profile(player).await?;
        let disposition = if created {
            Disposition::Created
        } else {
            Disposition::Updated
        };
        Ok(ResolveOutcome::Resolved {
            profile,
            disposition,
        })
    }

    /// Cache lookup by id, then by username.
    async fn lookup(&self, query: &PlayerQuery) -> Result<Option<Player>, SyncError> {
        if let Some(id) = &query.id {
            let identity = PlayerIdentity::from(id.clone());
            if let Some(player) = self.store.find_player(&identity).await? {
                return Ok(Some(player));
            }
        }
        match query.username.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(self.store.find_player_by_username(name).await?),
            _ => Ok(None),
        }
    }

    /// The local record a remote doc belongs to. A ghost holding the doc's
    /// username wins over the record under the doc's id so it gets merged.
    async fn find_for_doc(&self, doc: &PlayerDoc) -> Result<Option<Player>, SyncError> {
        let by_username = self.store.find_player_by_username(&doc.username).await?;
        if let Some(player) = by_username.as_ref().filter(|p| p.is_ghost()) {
            return Ok(Some(player.clone()));
        }

        let identity = PlayerIdentity::from(doc.player_id.clone());
        if let Some(player) = self.store.find_player(&identity).await? {
            return Ok(Some(player));
        }
        Ok(by_username)
    }

    /// Match a remote doc to a local record, creating, merging or repairing
    /// it as needed.
    ///
    /// `cached` is what the caller already looked up, if anything. With
    /// `mastery` a new record is seeded with the doc's full profile; without
    /// it only id, username and region are stored, as a leaderboard crawl
    /// does.
    pub async fn adopt(
        &self,
        doc: &PlayerDoc,
        cached: Option<Player>,
        region: Region,
        mastery: Option<&MasteryDoc>,
    ) -> Result<Adoption, SyncError> {
        let cached = match cached {
            Some(player) => Some(player),
            None => self.find_for_doc(doc).await?,
        };

        let player = match cached {
            Some(player) => player,
            None => {
                let mut player =
                    Player::new(doc.player_id.clone(), doc.username.as_str()).with_region(region);
                if let Some(mastery) = mastery {
                    reconcile::profile_diff(&player, doc, Some(mastery), None).apply(&mut player);
                }

                match self.store.create_player(&player).await {
                    Ok(()) => {
                        info!("Created player '{}' ({})", player.username, doc.player_id);
                        return Ok(Adoption::Created(player));
                    }
                    Err(e) if e.is_unique_violation() => {
                        debug!("{} created concurrently, reloading", doc.player_id);
                        match self.find_for_doc(doc).await? {
                            Some(existing) => existing,
                            None => return Err(e.into()),
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let was_ghost = player.is_ghost();
        let mut player = if was_ghost {
            ghost::merge_ghost(self.store.as_ref(), &player, doc).await?
        } else {
            player
        };

        if let IdentityDrift::IdMismatch { cached, remote } = reconcile::identity_drift(&player, doc)
        {
            error!(
                "Player id mismatch for '{}': cached {}, remote {}",
                doc.username, cached, remote
            );
            match self.store.reassign_identity(&player.identity, &remote).await {
                Ok(repaired) => {
                    warn!("Repaired id of '{}': {} -> {}", doc.username, cached, remote);
                    player = repaired;
                }
                Err(e) if e.is_unique_violation() => {
                    error!(
                        "Cannot repair '{}': {} already belongs to another player. Operator action required",
                        doc.username, remote
                    );
                    return Ok(Adoption::Corrupt(MismatchReport {
                        username: doc.username.clone(),
                        cached_id: cached,
                        remote_id: remote,
                        detected_at: Utc::now(),
                    }));
                }
                Err(e) => return Err(e.into()),
            }
        }

        match reconcile::identity_drift(&player, doc) {
            IdentityDrift::UsernameChange { old, new } => {
                warn!(
                    "Username changed: '{}' -> '{}' ({})",
                    old, new, doc.player_id
                );
                let change = NameChange::new(doc.player_id.clone(), old, new.as_str(), Utc::now());
                if !self.store.record_name_change(change).await? {
                    debug!("Name change for {} already recorded", doc.player_id);
                }
                player = apply_username(self.store.as_ref(), player, &new).await?;
            }
            IdentityDrift::CaseChange { new, .. } => {
                player = apply_username(self.store.as_ref(), player, &new).await?;
            }
            IdentityDrift::None | IdentityDrift::IdMismatch { .. } => {}
        }

        Ok(Adoption::Existing { player, was_ghost })
    }

    /// Link roster entries waiting on this player's id. Failures are logged.
    async fn link_roster(&self, player: &Player) {
        let Some(id) = player.id() else {
            return;
        };

        let entries = match self.store.unlinked_roster_entries(id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Roster lookup for {} failed: {}", id, e);
                return;
            }
        };

        for entry in entries {
            match self.store.link_roster_entry(&entry, id).await {
                Ok(()) => info!("Linked '{}' to team '{}'", player.username, entry.team_name),
                Err(e) => warn!(
                    "Failed to link '{}' to team '{}': {}",
                    player.username, entry.team_name, e
                ),
            }
        }
    }
}
