//! Ordered remote lookup strategies.
//!
//! The username endpoint does fuzzy matching and cannot be trusted for
//! ambiguous names, so those go straight to rank search by id. Strategies run
//! in order; the first `Found` wins and failures fall through to the next.
//! A 404 from the service is a miss, not a failure.

use tracing::{debug, warn};

use crate::models::{Player, PlayerId, Region};
use crate::remote::{PlayerDoc, RemoteError, StatsProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    UsernameQuery(String),
    /// Rank search by id. A returned row whose username differs from
    /// `expected_username` counts as not found.
    RankSearch {
        id: PlayerId,
        expected_username: Option<String>,
    },
}

#[derive(Debug)]
pub enum StrategyResult {
    Found(PlayerDoc),
    NotFound,
    Failed(RemoteError),
}

#[derive(Debug)]
pub enum ChainOutcome {
    Found(PlayerDoc),
    NotFound,
    /// Every strategy attempted failed without the service answering.
    Unavailable(String),
}

/// Empty or single-character names.
pub fn is_ambiguous(username: &str) -> bool {
    username.trim().chars().count() <= 1
}

/// Build the chain for a query and whatever the cache knows.
///
/// A caller-supplied id is taken under whatever name the service now reports
/// for it, and leads the chain when no username was given. The cached id is
/// only trusted while the service still reports the expected name for it.
pub fn plan(
    username: Option<&str>,
    id: Option<&PlayerId>,
    cached: Option<&Player>,
) -> Vec<Strategy> {
    let requested = username.map(str::trim).filter(|n| !n.is_empty());
    let name = requested.or_else(|| cached.map(|p| p.username.as_str()));
    let by_requested_id = id.map(|id| Strategy::RankSearch {
        id: id.clone(),
        expected_username: None,
    });

    let mut chain = Vec::new();

    if requested.is_none() {
        chain.extend(by_requested_id.clone());
    }
    if let Some(name) = name {
        if !is_ambiguous(name) {
            chain.push(Strategy::UsernameQuery(name.to_string()));
        }
    }
    if requested.is_some() {
        chain.extend(by_requested_id);
    }

    if let Some(cached_id) = cached.and_then(|p| p.id()) {
        if id != Some(cached_id) {
            chain.push(Strategy::RankSearch {
                id: cached_id.clone(),
                expected_username: name.map(str::to_string),
            });
        }
    }

    chain
}

pub async fn attempt(provider: &dyn StatsProvider, strategy: &Strategy) -> StrategyResult {
    match strategy {
        Strategy::UsernameQuery(name) => match provider.query_by_username(name).await {
            Ok(Some(doc)) => StrategyResult::Found(doc),
            Ok(None) => StrategyResult::NotFound,
            Err(e) if e.is_not_found() => StrategyResult::NotFound,
            Err(e) => StrategyResult::Failed(e),
        },
        Strategy::RankSearch {
            id,
            expected_username,
        } => {
            let search = match provider.search_ranking(id, 0, 0, Region::Global).await {
                Ok(search) => search,
                Err(e) if e.is_not_found() => return StrategyResult::NotFound,
                Err(e) => return StrategyResult::Failed(e),
            };
            let Some(entry) = search.players.into_iter().next() else {
                return StrategyResult::NotFound;
            };
            if let Some(expected) = expected_username {
                if entry.player.username.to_lowercase() != expected.to_lowercase() {
                    debug!(
                        "Rank search for {} returned '{}', expected '{}'",
                        id, entry.player.username, expected
                    );
                    return StrategyResult::NotFound;
                }
            }
            StrategyResult::Found(entry.player)
        }
    }
}

/// Run strategies in order until one finds the player.
pub async fn run_chain(provider: &dyn StatsProvider, chain: &[Strategy]) -> ChainOutcome {
    let mut failures = Vec::new();

    for strategy in chain {
        match attempt(provider, strategy).await {
            StrategyResult::Found(doc) => {
                debug!("{:?} found {}", strategy, doc.player_id);
                return ChainOutcome::Found(doc);
            }
            StrategyResult::NotFound => {
                debug!("{:?} found nothing, trying next", strategy);
            }
            StrategyResult::Failed(e) => {
                warn!("{:?} failed via {}: {}", strategy, provider.name(), e);
                failures.push(e.to_string());
            }
        }
    }

    if !chain.is_empty() && failures.len() == chain.len() {
        ChainOutcome::Unavailable(failures.join("; "))
    } else {
        ChainOutcome::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::{player_doc, ranking_entry, MockProvider};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ambiguous_names() {
        assert!(is_ambiguous(""));
        assert!(is_ambiguous(" x "));
        assert!(is_ambiguous("é"));
        assert!(!is_ambiguous("Zed"));
    }

    #[test]
    fn test_plan_username_only() {
        assert_eq!(
            plan(Some("Zed1"), None, None),
            vec![Strategy::UsernameQuery("Zed1".to_string())]
        );
    }

    #[test]
    fn test_plan_ambiguous_skips_username_query() {
        let cached = Player::new(PlayerId::from("P5"), "x");
        assert_eq!(
            plan(Some("x"), None, Some(&cached)),
            vec![Strategy::RankSearch {
                id: PlayerId::from("P5"),
                expected_username: Some("x".to_string()),
            }]
        );
    }

    #[test]
    fn test_plan_ambiguous_without_cache_is_empty() {
        assert!(plan(Some("x"), None, None).is_empty());
    }

    #[test]
    fn test_plan_full_chain_dedupes_ids() {
        let cached = Player::new(PlayerId::from("P1"), "Zed1");
        let chain = plan(Some("Zed1"), Some(&PlayerId::from("P1")), Some(&cached));
        assert_eq!(chain.len(), 2);

        let cached = Player::new(PlayerId::from("P2"), "Zed1");
        let chain = plan(Some("Zed1"), Some(&PlayerId::from("P1")), Some(&cached));
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_plan_requested_id_leads_without_name_check() {
        let cached = Player::new(PlayerId::from("P1"), "Zed1");
        assert_eq!(
            plan(None, Some(&PlayerId::from("P1")), Some(&cached)),
            vec![
                Strategy::RankSearch {
                    id: PlayerId::from("P1"),
                    expected_username: None,
                },
                Strategy::UsernameQuery("Zed1".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_ghost_cache_contributes_name_only() {
        let ghost = Player::ghost("nova");
        assert_eq!(
            plan(None, None, Some(&ghost)),
            vec![Strategy::UsernameQuery("nova".to_string())]
        );
    }

    #[tokio::test]
    async fn test_rank_search_rejects_other_username() {
        let provider = MockProvider::new();
        provider.set_ranking(Region::Global, ranking_entry("P5", "y", 1500, 20));

        let strategy = Strategy::RankSearch {
            id: PlayerId::from("P5"),
            expected_username: Some("x".to_string()),
        };
        assert!(matches!(
            attempt(&provider, &strategy).await,
            StrategyResult::NotFound
        ));
    }

    #[tokio::test]
    async fn test_chain_falls_through_failure() {
        let provider = MockProvider::new();
        provider.fail("query_by_username");
        provider.set_ranking(Region::Global, ranking_entry("P1", "Zed1", 1500, 20));

        let chain = vec![
            Strategy::UsernameQuery("Zed1".to_string()),
            Strategy::RankSearch {
                id: PlayerId::from("P1"),
                expected_username: Some("zed1".to_string()),
            },
        ];
        match run_chain(&provider, &chain).await {
            ChainOutcome::Found(doc) => assert_eq!(doc.player_id, PlayerId::from("P1")),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chain_first_found_wins() {
        let provider = MockProvider::new();
        provider.set_doc(player_doc("P1", "Zed1"));

        let chain = vec![
            Strategy::UsernameQuery("zed1".to_string()),
            Strategy::RankSearch {
                id: PlayerId::from("P9"),
                expected_username: None,
            },
        ];
        assert!(matches!(
            run_chain(&provider, &chain).await,
            ChainOutcome::Found(_)
        ));
        assert_eq!(provider.calls("search_ranking"), 0);
    }

    #[tokio::test]
    async fn test_chain_all_failed_is_unavailable() {
        let provider = MockProvider::new();
        provider.fail("query_by_username");

        let chain = vec![Strategy::UsernameQuery("Zed1".to_string())];
        assert!(matches!(
            run_chain(&provider, &chain).await,
            ChainOutcome::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_chain_missing_id_is_not_found() {
        let provider = MockProvider::new();
        provider.fail_with("search_ranking", 404);

        let chain = vec![Strategy::RankSearch {
            id: PlayerId::from("P5"),
            expected_username: Some("x".to_string()),
        }];
        assert!(matches!(
            run_chain(&provider, &chain).await,
            ChainOutcome::NotFound
        ));
    }

    #[tokio::test]
    async fn test_chain_mixed_failure_and_miss_is_not_found() {
        let provider = MockProvider::new();
        provider.fail("query_by_username");

        let chain = vec![
            Strategy::UsernameQuery("Zed1".to_string()),
            Strategy::RankSearch {
                id: PlayerId::from("P1"),
                expected_username: None,
            },
        ];
        assert!(matches!(
            run_chain(&provider, &chain).await,
            ChainOutcome::NotFound
        ));
    }
}
