use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;

use super::*;
use crate::models::{PlayerRating, RatingSnapshot, RosterEntry};
use crate::remote::mock::{character_stat, player_doc, ranking_entry, MockProvider};
use crate::storage::MemoryStore;

struct Fixture {
    provider: Arc<MockProvider>,
    store: Arc<MemoryStore>,
    sync: PlayerSync,
}

fn fixture() -> Fixture {
    let provider = Arc::new(MockProvider::new());
    let store = Arc::new(MemoryStore::new());
    let sync = PlayerSync::new(provider.clone(), store.clone());
    Fixture {
        provider,
        store,
        sync,
    }
}

fn refresh() -> ResolveOptions {
    ResolveOptions::default()
}

/// A remote player ranked in Europe with mastery and character stats.
fn publish(provider: &MockProvider, id: &str, username: &str, rating: u32, rank: u32) {
    provider.set_doc(player_doc(id, username));
    provider.set_ranking(Region::Europe, ranking_entry(id, username, rating, rank));
    provider.set_mastery(id, 40, 1200);
    provider.set_character_stats(
        id,
        vec![character_stat("CD_Ai", "RankedInitial", 10, Some(4))],
    );
}

async fn seed_rating(store: &MemoryStore, id: &str, rating: u32, rank: u32) -> PlayerRating {
    let snapshot = RatingSnapshot {
        rating,
        rank,
        games: 15,
        wins: 10,
        losses: 5,
    };
    let row = PlayerRating::from_snapshot(
        PlayerIdentity::resolved(id),
        &snapshot,
        40,
        Utc::now() - TimeDelta::hours(1),
    );
    store.insert_rating(row).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_new_player_created_with_one_rating() {
    let f = fixture();
    publish(&f.provider, "P900", "Zed1", 1800, 42);

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    assert_eq!(outcome.disposition(), Some(Disposition::Created));
    let profile = outcome.profile().unwrap();
    assert_eq!(profile.player.id(), Some(&PlayerId::from("P900")));
    assert_eq!(profile.player.region, Region::Europe);
    assert_eq!(profile.player.current_xp, Some(1200));
    assert_eq!(profile.ratings.len(), 1);
    assert_eq!(profile.ratings[0].rating, 1800);
    assert_eq!(profile.ratings[0].rank, 42);
    assert_eq!(profile.character_ratings.len(), 2);

    let log = f.store.latest_rating_log(&PlayerId::from("P900")).await.unwrap();
    assert_eq!(log.map(|e| e.rating), Some(1800));
}

#[tokio::test]
async fn test_rank_only_change_patches_existing_row() {
    let f = fixture();
    f.store
        .create_player(&Player::new(PlayerId::from("P1639"), "Zed1"))
        .await
        .unwrap();
    let seeded = seed_rating(&f.store, "P1639", 2400, 12).await;
    publish(&f.provider, "P1639", "Zed1", 2400, 9);

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    assert_eq!(outcome.disposition(), Some(Disposition::Updated));
    let ratings = &outcome.profile().unwrap().ratings;
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].id, seeded.id);
    assert_eq!(ratings[0].rank, 9);
}

#[tokio::test]
async fn test_ghost_promoted_in_place() {
    let f = fixture();
    f.store.create_player(&Player::ghost("nova")).await.unwrap();
    f.provider.set_doc(player_doc("P77", "Nova"));

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("nova"), refresh())
        .await
        .unwrap();

    let profile = outcome.profile().unwrap();
    assert_eq!(profile.player.id(), Some(&PlayerId::from("P77")));
    assert_eq!(profile.player.username, "Nova");
    assert_eq!(f.store.list_players().await.unwrap().len(), 1);
    assert!(f
        .store
        .find_player(&PlayerIdentity::ghost("nova"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_ghost_union_into_canonical() {
    let f = fixture();
    let ghost = Player::ghost("nova");
    f.store.create_player(&ghost).await.unwrap();
    f.store
        .create_player(&Player::new(PlayerId::from("P77"), "Supernova"))
        .await
        .unwrap();

    let t = Utc::now() - TimeDelta::days(3);
    let snapshot = RatingSnapshot::unranked();
    let canonical = PlayerIdentity::resolved("P77");
    let seeded = [
        (&ghost.identity, 1),
        (&ghost.identity, 2),
        (&canonical, 2),
        (&canonical, 3),
    ];
    for (owner, hours) in seeded {
        let at = t + TimeDelta::hours(hours);
        let row = PlayerRating::from_snapshot(owner.clone(), &snapshot, 1, at);
        f.store.insert_rating(row).await.unwrap();
    }
    f.provider.set_doc(player_doc("P77", "Nova"));

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("nova"), refresh())
        .await
        .unwrap();

    let profile = outcome.profile().unwrap();
    assert_eq!(profile.player.username, "Nova");
    let historic: Vec<_> = profile
        .ratings
        .iter()
        .filter(|r| r.created_at < Utc::now() - TimeDelta::days(1))
        .map(|r| r.created_at)
        .collect();
    assert_eq!(
        historic,
        vec![
            t + TimeDelta::hours(3),
            t + TimeDelta::hours(2),
            t + TimeDelta::hours(1),
        ]
    );
    assert!(f.store.find_player(&ghost.identity).await.unwrap().is_none());
}

#[tokio::test]
async fn test_resolve_twice_is_idempotent() {
    let f = fixture();
    publish(&f.provider, "P900", "Zed1", 1800, 42);

    let first = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();
    let second = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    assert_eq!(first.disposition(), Some(Disposition::Created));
    assert_eq!(second.disposition(), Some(Disposition::Unchanged));

    let tables = f.store.snapshot().await;
    assert_eq!(tables.players.len(), 1);
    assert_eq!(tables.ratings.len(), 1);
    assert_eq!(tables.character_ratings.len(), 2);
    assert_eq!(tables.rating_log.len(), 1);
    assert!(tables.name_history.is_empty());
}

#[tokio::test]
async fn test_case_variants_converge_on_latest_casing() {
    let f = fixture();
    publish(&f.provider, "P1", "zed1", 1500, 300);
    f.sync
        .resolve(&PlayerQuery::username("zed1"), refresh())
        .await
        .unwrap();

    publish(&f.provider, "P1", "ZeD1", 1500, 300);
    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("ZED1"), refresh())
        .await
        .unwrap();

    assert_eq!(outcome.profile().unwrap().player.username, "ZeD1");
    let tables = f.store.snapshot().await;
    assert_eq!(tables.players.len(), 1);
    assert!(tables.name_history.is_empty());
}

#[tokio::test]
async fn test_rename_recorded_once() {
    let f = fixture();
    publish(&f.provider, "P1", "Zed1", 1500, 300);
    f.sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    f.provider.remove_doc("Zed1");
    publish(&f.provider, "P1", "Zed2", 1500, 300);
    for _ in 0..2 {
        f.sync
            .resolve(&PlayerQuery::username("Zed2"), refresh())
            .await
            .unwrap();
    }

    let history = f.store.name_history(&PlayerId::from("P1")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_username, "Zed1");
    assert_eq!(history[0].new_username, "Zed2");
    let player = f.store.find_player_by_username("zed2").await.unwrap().unwrap();
    assert_eq!(player.id(), Some(&PlayerId::from("P1")));
}

#[tokio::test]
async fn test_unrepairable_mismatch_is_data_corruption() {
    let f = fixture();
    f.store
        .create_player(&Player::new(PlayerId::from("P1"), "Zed1"))
        .await
        .unwrap();
    f.store
        .create_player(&Player::new(PlayerId::from("P2"), "Other"))
        .await
        .unwrap();
    f.provider.set_doc(player_doc("P2", "Zed1"));

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    match outcome {
        ResolveOutcome::DataCorruption(report) => {
            assert_eq!(report.cached_id, PlayerId::from("P1"));
            assert_eq!(report.remote_id, PlayerId::from("P2"));
        }
        other => panic!("expected DataCorruption, got {:?}", other),
    }
}

#[tokio::test]
async fn test_repairable_mismatch_moves_id() {
    let f = fixture();
    f.store
        .create_player(&Player::new(PlayerId::from("P1"), "Zed1"))
        .await
        .unwrap();
    seed_rating(&f.store, "P1", 1500, 300).await;
    publish(&f.provider, "P2", "Zed1", 1500, 300);

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    let profile = outcome.profile().unwrap();
    assert_eq!(profile.player.id(), Some(&PlayerId::from("P2")));
    assert!(!profile.ratings.is_empty());
    assert!(f
        .store
        .find_player(&PlayerIdentity::resolved("P1"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_all_strategies_failing_is_transient() {
    let f = fixture();
    f.provider.fail("query_by_username");

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();
    assert!(matches!(outcome, ResolveOutcome::TransientUpstream(_)));
}

#[tokio::test]
async fn test_unknown_everywhere_is_not_found() {
    let f = fixture();
    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("Nobody"), refresh())
        .await
        .unwrap();
    assert_eq!(outcome, ResolveOutcome::NotFound);
    assert!(f.store.list_players().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ambiguous_name_never_uses_username_query() {
    let f = fixture();
    f.store
        .create_player(&Player::new(PlayerId::from("P5"), "x"))
        .await
        .unwrap();
    f.provider.set_doc(player_doc("P6", "x"));
    f.provider
        .set_ranking(Region::Global, ranking_entry("P5", "x", 1400, 30));

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("x"), refresh())
        .await
        .unwrap();

    assert_eq!(f.provider.calls("query_by_username"), 0);
    assert_eq!(
        outcome.profile().unwrap().player.id(),
        Some(&PlayerId::from("P5"))
    );
}

#[tokio::test]
async fn test_trust_cache_skips_remote() {
    let f = fixture();
    f.store
        .create_player(&Player::new(PlayerId::from("P1"), "Zed1"))
        .await
        .unwrap();

    let options = ResolveOptions {
        trust_cache: true,
        ..Default::default()
    };
    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("ZED1"), options)
        .await
        .unwrap();

    assert_eq!(outcome.disposition(), Some(Disposition::Cached));
    assert_eq!(f.provider.calls("query_by_username"), 0);
    assert_eq!(f.provider.calls("search_ranking"), 0);
}

#[tokio::test]
async fn test_character_stats_failure_still_updates() {
    let f = fixture();
    publish(&f.provider, "P900", "Zed1", 1800, 42);
    f.provider.fail("fetch_character_stats");

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    let profile = outcome.profile().unwrap();
    assert_eq!(profile.ratings.len(), 1);
    assert!(profile.character_ratings.is_empty());
}

#[tokio::test]
async fn test_roster_linked_on_creation() {
    let f = fixture();
    let entry = RosterEntry {
        user_id: PlayerId::from("P900"),
        team_name: "Comets".to_string(),
        series: "Open".to_string(),
        season: "S3".to_string(),
        linked_id: None,
    };
    f.store.add_roster_entry(entry).await.unwrap();
    publish(&f.provider, "P900", "Zed1", 1800, 42);

    f.sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    let tables = f.store.snapshot().await;
    assert_eq!(tables.roster[0].linked_id, Some(PlayerId::from("P900")));
}

#[tokio::test]
async fn test_purge_ratings_requires_player() {
    let f = fixture();
    let err = f.sync.purge_ratings(&PlayerId::from("P404")).await.unwrap_err();
    assert!(matches!(err, SyncError::PlayerNotFound(_)));

    f.store
        .create_player(&Player::new(PlayerId::from("P1"), "Zed1"))
        .await
        .unwrap();
    seed_rating(&f.store, "P1", 1500, 300).await;
    assert_eq!(f.sync.purge_ratings(&PlayerId::from("P1")).await.unwrap(), 1);
}

#[tokio::test]
async fn test_seed_ghost_rejects_taken_name() {
    let f = fixture();
    f.sync.seed_ghost(" nova ").await.unwrap();
    assert!(f.sync.seed_ghost("NOVA").await.is_err());
}

#[test]
fn test_query_parse_classifies_input() {
    let id = "5f0c2a9e1b3d4c5e6f7a8b9c";
    assert_eq!(PlayerQuery::parse(id), PlayerQuery::id(id));
    assert_eq!(PlayerQuery::parse(" Zed1 "), PlayerQuery::username("Zed1"));
    assert!(PlayerQuery::parse("   ").is_empty());
}

#[tokio::test]
async fn test_empty_query_is_not_found_without_remote_calls() {
    let f = fixture();
    let outcome = f
        .sync
        .resolve(&PlayerQuery::default(), ResolveOptions::default())
        .await
        .unwrap();
    assert!(matches!(outcome, ResolveOutcome::NotFound));
    assert_eq!(f.provider.calls("query_by_username"), 0);
}

#[tokio::test]
async fn test_rename_detected_through_id_lookup() {
    let f = fixture();
    publish(&f.provider, "P1", "Zed1", 1500, 300);
    f.sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    f.provider.remove_doc("Zed1");
    publish(&f.provider, "P1", "Zed2", 1500, 300);
    f.provider
        .set_ranking(Region::Global, ranking_entry("P1", "Zed2", 1500, 300));

    let outcome = f
        .sync
        .resolve(&PlayerQuery::id("P1"), refresh())
        .await
        .unwrap();

    assert_eq!(outcome.profile().unwrap().player.username, "Zed2");
    let history = f.store.name_history(&PlayerId::from("P1")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_username, "Zed1");
}

#[tokio::test]
async fn test_known_player_probes_stored_region_only() {
    let f = fixture();
    publish(&f.provider, "P1", "Zed1", 1500, 300);
    f.sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();
    let first_pass = f.provider.calls("search_ranking");

    publish(&f.provider, "P1", "Zed1", 1525, 290);
    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("Zed1"), refresh())
        .await
        .unwrap();

    assert_eq!(f.provider.calls("search_ranking") - first_pass, 1);
    let profile = outcome.profile().unwrap();
    assert_eq!(profile.player.region, Region::Europe);
    assert_eq!(profile.latest_rating().unwrap().rating, 1525);
}

#[tokio::test]
async fn test_missing_ranking_for_cached_id_is_not_found() {
    let f = fixture();
    f.store
        .create_player(&Player::new(PlayerId::from("P5"), "x"))
        .await
        .unwrap();
    f.provider.fail_with("search_ranking", 404);

    let outcome = f
        .sync
        .resolve(&PlayerQuery::username("x"), refresh())
        .await
        .unwrap();
    assert_eq!(outcome, ResolveOutcome::NotFound);
}
