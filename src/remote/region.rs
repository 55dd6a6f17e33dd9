//! Region probing.

use tracing::{debug, info};

use super::{RankingEntry, StatsProvider};
use crate::models::{PlayerId, Region};

/// Global placements worse than this are skipped in favour of a regional
/// result.
pub const GLOBAL_RANK_CUTOFF: u32 = 100;

/// The region a player was found in, with their ranking there.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsuredRegion {
    pub entry: RankingEntry,
    pub region: Region,
}

/// Find the region that ranks a player.
///
/// Without a hint (or with a Global hint) every region is probed in
/// `Region::PROBE_ORDER`; with a regional hint only that region is tried.
/// The first region returning a row wins, except that a Global row ranked
/// worse than `GLOBAL_RANK_CUTOFF` is passed over. Failed probes move on to
/// the next region.
pub async fn ensure_region(
    provider: &dyn StatsProvider,
    id: &PlayerId,
    hint: Option<Region>,
) -> Option<EnsuredRegion> {
    let candidates: Vec<Region> = match hint {
        Some(Region::Global) | None => Region::PROBE_ORDER.to_vec(),
        Some(region) => vec![region],
    };

    for region in candidates {
        debug!("Checking {} for {}", region, id);
        let search = match provider.search_ranking(id, 0, 0, region).await {
            Ok(search) => search,
            Err(e) => {
                debug!("Region probe {} failed for {}: {}", region, id, e);
                continue;
            }
        };

        let Some(entry) = search.players.into_iter().next() else {
            continue;
        };

        if region == Region::Global && entry.rank > GLOBAL_RANK_CUTOFF {
            continue;
        }

        info!("Found {} in region {}", id, region);
        return Some(EnsuredRegion { entry, region });
    }

    None
}
