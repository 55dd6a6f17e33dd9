//! Decide whether a cached profile can skip a stats refresh.

use crate::models::PlayerProfile;
use crate::remote::{MasteryDoc, RankingEntry};

/// True when the cache already matches remote state.
///
/// Requires equal XP, equal mastery level on the latest rating row, equal
/// latest rating, and a non-ghost record. A profile with rating history but
/// no character aggregates never skips; that shape follows a season reset.
pub fn should_skip_update(
    cached: &PlayerProfile,
    mastery: &MasteryDoc,
    ranking: Option<&RankingEntry>,
    is_ghost: bool,
) -> bool {
    if cached.character_ratings.is_empty() && !cached.ratings.is_empty() {
        return false;
    }

    let latest = cached.latest_rating();

    cached.player.current_xp == Some(mastery.current_level_xp)
        && latest.map(|r| r.mastery_level) == Some(mastery.current_level)
        && latest.map(|r| r.rating) == ranking.map(|r| r.rating)
        && !is_ghost
}
