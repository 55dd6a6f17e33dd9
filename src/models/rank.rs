//! Rating tiers.

/// A named rating tier starting at `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankTier {
    pub name: &'static str,
    pub threshold: u32,
}

const TIERS: [RankTier; 24] = [
    RankTier { name: "Inactive/Unranked", threshold: 0 },
    RankTier { name: "Rookie", threshold: 800 },
    RankTier { name: "Mid Rookie", threshold: 900 },
    RankTier { name: "High Rookie", threshold: 1000 },
    RankTier { name: "Bronze", threshold: 1100 },
    RankTier { name: "Mid Bronze", threshold: 1200 },
    RankTier { name: "High Bronze", threshold: 1300 },
    RankTier { name: "Silver", threshold: 1400 },
    RankTier { name: "Mid Silver", threshold: 1500 },
    RankTier { name: "High Silver", threshold: 1600 },
    RankTier { name: "Gold", threshold: 1700 },
    RankTier { name: "Mid Gold", threshold: 1800 },
    RankTier { name: "High Gold", threshold: 1900 },
    RankTier { name: "Platinum", threshold: 2000 },
    RankTier { name: "Mid Platinum", threshold: 2100 },
    RankTier { name: "High Platinum", threshold: 2200 },
    RankTier { name: "Diamond", threshold: 2300 },
    RankTier { name: "Mid Diamond", threshold: 2400 },
    RankTier { name: "High Diamond", threshold: 2500 },
    RankTier { name: "Challenger", threshold: 2600 },
    RankTier { name: "Mid Challenger", threshold: 2700 },
    RankTier { name: "High Challenger", threshold: 2800 },
    RankTier { name: "Omega", threshold: 2900 },
    RankTier { name: "Pro League", threshold: 3000 },
];

/// Highest tier whose threshold the rating reaches.
pub fn tier_for_rating(rating: u32) -> RankTier {
    TIERS
        .iter()
        .rev()
        .find(|tier| rating >= tier.threshold)
        .copied()
        .unwrap_or(TIERS[0])
}

/// Tier name with the Mid/High prefix removed.
pub fn rank_group(rating: u32) -> &'static str {
    let name = tier_for_rating(rating).name;
    name.strip_prefix("Mid ")
        .or_else(|| name.strip_prefix("High "))
        .unwrap_or(name)
}
