//! Scripted in-process stats provider for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    CharacterStat, CharacterStatsDoc, LeaderboardPage, MasteryDoc, Paging, PlayerDoc,
    RankingEntry, RankingSearch, RemoteError, RoleStats, RoleStatsByRole, StatsProvider,
};
use crate::models::{PlayerId, Region};

#[derive(Default)]
struct MockState {
    docs: HashMap<String, PlayerDoc>,
    rankings: HashMap<Region, Vec<RankingEntry>>,
    mastery: HashMap<PlayerId, MasteryDoc>,
    characters: HashMap<PlayerId, CharacterStatsDoc>,
    failing: HashMap<&'static str, u16>,
    failing_regions: HashSet<Region>,
    calls: HashMap<&'static str, usize>,
}

/// Provider answering from in-memory tables, counting every call.
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

pub fn player_doc(id: &str, username: &str) -> PlayerDoc {
    PlayerDoc {
        username: username.to_string(),
        player_id: PlayerId::from(id),
        logo_id: None,
        title: None,
        nameplate_id: None,
        emoticon_id: Some("E_Default".to_string()),
        title_id: None,
        tags: Vec::new(),
        platform_ids: Default::default(),
        mastery_level: 0,
        player_status: None,
        social_url: None,
    }
}

pub fn ranking_entry(id: &str, username: &str, rating: u32, rank: u32) -> RankingEntry {
    RankingEntry {
        player: player_doc(id, username),
        rank,
        wins: 10,
        losses: 5,
        games: 15,
        top_role: Some("Forward".to_string()),
        rating,
        most_played_characters: Vec::new(),
        current_division_id: None,
        progress_to_next: None,
    }
}

pub fn character_stat(character: &str, gamemode: &str, forward: u32, goalie: Option<u32>) -> CharacterStat {
    let stats = |games: u32| RoleStats {
        games,
        wins: games / 2,
        losses: games - games / 2,
        ..Default::default()
    };
    CharacterStat {
        character_id: character.to_string(),
        rating_name: gamemode.to_string(),
        role_stats: RoleStatsByRole {
            forward: Some(stats(forward)),
            goalie: goalie.map(stats),
        },
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_doc(&self, doc: PlayerDoc) {
        let mut state = self.state.lock().unwrap();
        state.docs.insert(doc.username.to_lowercase(), doc);
    }

    pub fn remove_doc(&self, username: &str) {
        self.state.lock().unwrap().docs.remove(&username.to_lowercase());
    }

    /// Insert or replace the player's row in a region.
    pub fn set_ranking(&self, region: Region, entry: RankingEntry) {
        let mut state = self.state.lock().unwrap();
        let rows = state.rankings.entry(region).or_default();
        rows.retain(|row| row.player.player_id != entry.player.player_id);
        rows.push(entry);
        rows.sort_by_key(|row| row.rank);
    }

    pub fn set_mastery(&self, id: &str, level: u32, xp: u64) {
        self.state.lock().unwrap().mastery.insert(
            PlayerId::from(id),
            MasteryDoc {
                current_level: level,
                current_level_xp: xp,
                total_xp: xp,
                ..Default::default()
            },
        );
    }

    pub fn set_character_stats(&self, id: &str, stats: Vec<CharacterStat>) {
        self.state.lock().unwrap().characters.insert(
            PlayerId::from(id),
            CharacterStatsDoc {
                character_stats: stats,
            },
        );
    }

    /// Make every call to `method` fail with a 503.
    pub fn fail(&self, method: &'static str) {
        self.fail_with(method, 503);
    }

    pub fn fail_with(&self, method: &'static str, status: u16) {
        self.state.lock().unwrap().failing.insert(method, status);
    }

    pub fn fail_region(&self, region: Region) {
        self.state.lock().unwrap().failing_regions.insert(region);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, method: &'static str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        if let Some(&status) = state.failing.get(method) {
            return Err(RemoteError::HttpStatus {
                status,
                message: format!("scripted failure of {}", method),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StatsProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn query_by_username(&self, username: &str) -> Result<Option<PlayerDoc>, RemoteError> {
        self.record("query_by_username")?;
        let state = self.state.lock().unwrap();
        Ok(state.docs.get(&username.to_lowercase()).cloned())
    }

    async fn search_ranking(
        &self,
        id: &PlayerId,
        _entries_before: u32,
        _entries_after: u32,
        region: Region,
    ) -> Result<RankingSearch, RemoteError> {
        self.record("search_ranking")?;
        let state = self.state.lock().unwrap();
        if state.failing_regions.contains(&region) {
            return Err(RemoteError::HttpStatus {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        let players = state
            .rankings
            .get(&region)
            .into_iter()
            .flatten()
            .filter(|row| &row.player.player_id == id)
            .cloned()
            .collect();
        Ok(RankingSearch { players })
    }

    async fn fetch_mastery(&self, id: &PlayerId) -> Result<MasteryDoc, RemoteError> {
        self.record("fetch_mastery")?;
        let state = self.state.lock().unwrap();
        Ok(state.mastery.get(id).copied().unwrap_or_default())
    }

    async fn fetch_character_stats(
        &self,
        id: &PlayerId,
    ) -> Result<CharacterStatsDoc, RemoteError> {
        self.record("fetch_character_stats")?;
        let state = self.state.lock().unwrap();
        Ok(state.characters.get(id).cloned().unwrap_or_default())
    }

    async fn leaderboard_page(
        &self,
        start_rank: u32,
        page_size: u32,
        region: Region,
    ) -> Result<LeaderboardPage, RemoteError> {
        self.record("leaderboard_page")?;
        let state = self.state.lock().unwrap();
        if state.failing_regions.contains(&region) {
            return Err(RemoteError::HttpStatus {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        let rows = state.rankings.get(&region).cloned().unwrap_or_default();
        let total = rows.len() as u32;
        let players = rows
            .into_iter()
            .skip(start_rank as usize)
            .take(page_size as usize)
            .collect();
        Ok(LeaderboardPage {
            players,
            paging: Paging {
                start_index: start_rank,
                page_size,
                total_items: total,
            },
        })
    }
}
