//! Actuator guard and effect tests.
//!
//! Each follow and unfollow re-checks its own preconditions against the
//! ledger at execution time, so these tests drive single actions against
//! the mocks and assert both the verdict and the side effects: which
//! remote calls happened, what the ledgers recorded, and how the local
//! follower mirror moved.
//!
//! Run with: cargo test -p flock-tender --test actuator_test

use chrono::{Duration, Utc};

use flock_common::TenderConfig;
use flock_tender::actuator::{Actuator, FollowOutcome, UnfollowOutcome};
use flock_tender::testing::{account, MockFlockStore, MockPlatform};

// Account 1 acts as identity 10 (api id 1000); identity 20 (api id 2000)
// is the usual target.
fn base_store() -> MockFlockStore {
    MockFlockStore::new()
        .with_identity(10, 1000)
        .with_identity(20, 2000)
}

// ---------------------------------------------------------------------------
// Follow guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn follow_performs_and_records() {
    let platform = MockPlatform::new();
    let store = base_store();
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.follow(20).await.unwrap();

    assert_eq!(outcome, FollowOutcome::Followed);
    assert_eq!(platform.follow_calls(), vec![2000]);
    let records = store.follow_records(1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].leader_id, 20);
    // The new edge lands in the leader's follower mirror immediately.
    assert!(store.follower_ids_of(20).contains(&10));
    // The profile that came back fills in the screen name.
    let leader = store.identity_for_api(2000).unwrap();
    assert_eq!(leader.screen_name.as_deref(), Some("user2000"));
}

#[tokio::test]
async fn repeat_follow_is_rejected_without_a_remote_call() {
    let platform = MockPlatform::new();
    let store = base_store().with_follow(1, 20, Utc::now() - Duration::days(3));
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.follow(20).await.unwrap();

    assert_eq!(outcome, FollowOutcome::AlreadyFollowed);
    assert!(platform.follow_calls().is_empty());
    assert_eq!(store.follow_records(1).len(), 1);
}

#[tokio::test]
async fn follow_blocked_within_cooldown() {
    let platform = MockPlatform::new();
    // Followed someone else one second ago; the cooldown is five.
    let store = base_store()
        .with_identity(21, 2100)
        .with_follow(1, 21, Utc::now() - Duration::seconds(1));
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.follow(20).await.unwrap();

    assert_eq!(outcome, FollowOutcome::Cooldown);
    assert!(platform.follow_calls().is_empty());
}

#[tokio::test]
async fn follow_proceeds_after_cooldown() {
    let platform = MockPlatform::new();
    let store = base_store()
        .with_identity(21, 2100)
        .with_follow(1, 21, Utc::now() - Duration::seconds(6));
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.follow(20).await.unwrap();

    assert_eq!(outcome, FollowOutcome::Followed);
    assert_eq!(platform.follow_calls(), vec![2000]);
}

#[tokio::test]
async fn daily_cap_blocks_the_next_follow() {
    let platform = MockPlatform::new();
    // 400 follows inside the trailing day, the newest two hours old so
    // the cooldown is long past.
    let mut store = base_store();
    for i in 0..400 {
        store = store.with_follow(1, 1000 + i, Utc::now() - Duration::hours(2));
    }
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.follow(20).await.unwrap();

    assert_eq!(outcome, FollowOutcome::DailyCapReached);
    assert!(platform.follow_calls().is_empty());
}

#[tokio::test]
async fn refused_follow_is_recorded_without_follow_back() {
    let platform = MockPlatform::new().forbid_follow(2000);
    let store = base_store();
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.follow(20).await.unwrap();

    assert_eq!(outcome, FollowOutcome::Recorded);
    // The ledger spends the pair so it is never retried, but no follower
    // edge is assumed.
    assert_eq!(store.follow_records(1).len(), 1);
    assert!(!store.follower_ids_of(20).contains(&10));
}

// ---------------------------------------------------------------------------
// Unfollow guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unfollow_requires_a_follow_record() {
    let platform = MockPlatform::new();
    let store = base_store();
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.unfollow(20).await.unwrap();

    assert_eq!(outcome, UnfollowOutcome::NeverFollowed);
    assert!(platform.unfollow_calls().is_empty());
    assert!(store.unfollow_records(1).is_empty());
}

#[tokio::test]
async fn repeat_unfollow_is_rejected() {
    let platform = MockPlatform::new();
    let store = base_store()
        .with_follow(1, 20, Utc::now() - Duration::days(40))
        .with_unfollow(1, 20, Utc::now() - Duration::days(1));
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.unfollow(20).await.unwrap();

    assert_eq!(outcome, UnfollowOutcome::AlreadyUnfollowed);
    assert!(platform.unfollow_calls().is_empty());
    assert_eq!(store.unfollow_records(1).len(), 1);
}

#[tokio::test]
async fn short_grace_blocks_young_unfollows() {
    let platform = MockPlatform::new();
    let store = base_store().with_follow(1, 20, Utc::now() - Duration::days(1));
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.unfollow(20).await.unwrap();

    assert_eq!(outcome, UnfollowOutcome::TooRecent);
    assert!(platform.unfollow_calls().is_empty());
}

#[tokio::test]
async fn reciprocated_follow_gets_the_long_grace() {
    let platform = MockPlatform::new();
    // Ten days in, past the short grace, but 20 follows back.
    let store = base_store()
        .with_follow(1, 20, Utc::now() - Duration::days(10))
        .with_follower_edge(10, 20);
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.unfollow(20).await.unwrap();

    assert_eq!(outcome, UnfollowOutcome::TooRecent);
    assert!(platform.unfollow_calls().is_empty());
}

#[tokio::test]
async fn long_grace_expires_reciprocated_follows() {
    let platform = MockPlatform::new();
    let store = base_store()
        .with_follow(1, 20, Utc::now() - Duration::days(30))
        .with_follower_edge(10, 20);
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.unfollow(20).await.unwrap();

    assert_eq!(outcome, UnfollowOutcome::Unfollowed);
    assert_eq!(platform.unfollow_calls(), vec![2000]);
}

#[tokio::test]
async fn unreciprocated_follow_unfollowed_after_short_grace() {
    let platform = MockPlatform::new();
    let store = base_store()
        .with_follow(1, 20, Utc::now() - Duration::days(3))
        .with_follower_edge(20, 10);
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.unfollow(20).await.unwrap();

    assert_eq!(outcome, UnfollowOutcome::Unfollowed);
    assert_eq!(platform.unfollow_calls(), vec![2000]);
    let records = store.unfollow_records(1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].leader_id, 20);
    // Our edge leaves the leader's follower mirror with the unfollow.
    assert!(!store.follower_ids_of(20).contains(&10));
}

#[tokio::test]
async fn vanished_target_is_skipped_without_a_record() {
    let platform = MockPlatform::new().missing_user(2000);
    let store = base_store().with_follow(1, 20, Utc::now() - Duration::days(3));
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);

    let outcome = actuator.unfollow(20).await.unwrap();

    // Non-fatal: the next leader sync drops the pair, nothing is written.
    assert_eq!(outcome, UnfollowOutcome::Vanished);
    assert!(platform.unfollow_calls().is_empty());
    assert!(store.unfollow_records(1).is_empty());
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unfollow_batch_counts_actions_and_skips() {
    let platform = MockPlatform::new();
    // 20 is overdue and unreciprocated; 21 was never followed.
    let store = base_store()
        .with_identity(21, 2100)
        .with_follow(1, 20, Utc::now() - Duration::days(3));
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);
    let mut stats = flock_tender::stats::CycleStats::default();

    let candidates = [20, 21].into_iter().collect();
    actuator.unfollow_batch(&candidates, &mut stats).await.unwrap();

    assert_eq!(stats.unfollowed, 1);
    assert_eq!(stats.unfollows_skipped, 1);
    assert_eq!(platform.unfollow_calls(), vec![2000]);
}

#[tokio::test]
async fn follow_batch_stops_at_the_budget() {
    let platform = MockPlatform::new();
    let store = base_store().with_identity(21, 2100);
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);
    let mut stats = flock_tender::stats::CycleStats::default();

    let pool = [20, 21].into_iter().collect();
    actuator.follow_batch(&pool, 1, &mut stats).await.unwrap();

    assert_eq!(stats.followed, 1);
    assert_eq!(platform.follow_calls().len(), 1);
}

#[tokio::test]
async fn follow_batch_does_nothing_without_budget() {
    let platform = MockPlatform::new();
    let store = base_store();
    let account = account(1, "wren", 10);
    let config = TenderConfig::default();
    let actuator = Actuator::new(&platform, &store, &account, &config);
    let mut stats = flock_tender::stats::CycleStats::default();

    let pool = [20].into_iter().collect();
    actuator.follow_batch(&pool, 0, &mut stats).await.unwrap();
    actuator.follow_batch(&pool, -25, &mut stats).await.unwrap();

    assert_eq!(stats.followed, 0);
    assert!(platform.follow_calls().is_empty());
}
