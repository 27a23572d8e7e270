//! Edge mirror sync and list mirror tests.
//!
//! GraphSync: freshness gating, the cursor walk, and watermark pruning —
//! including what a walk that dies mid-pagination leaves behind.
//! ListMirror: create-on-first-use, member resolution, and pushing the
//! outsider set in bounded batches.
//!
//! Run with: cargo test -p flock-tender --test sync_test

use chrono::{Duration, Utc};

use flock_common::EdgeDirection;
use flock_tender::lists::ListMirror;
use flock_tender::sync::GraphSync;
use flock_tender::testing::{page, single_page, MockFlockStore, MockPlatform};
use flock_tender::traits::FlockStore;
use roost_client::IdPage;

// ---------------------------------------------------------------------------
// GraphSync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_sync_builds_the_mirror() {
    let platform = MockPlatform::new().with_leaders(1000, &[2000, 2001]);
    let store = MockFlockStore::new().with_identity(10, 1000);
    let sync = GraphSync::new(&platform, &store, "t");

    let synced = sync
        .sync_edges(10, EdgeDirection::Leaders, Duration::days(3))
        .await
        .unwrap();

    assert!(synced);
    let a = store.local_id(2000).unwrap();
    let b = store.local_id(2001).unwrap();
    assert_eq!(store.leader_ids_of(10), [a, b].into_iter().collect());
    // The walk stamps the sync time only after the terminal page.
    let owner = store.identity_for_api(1000).unwrap();
    assert!(owner.leaders_synced_at.is_some());
}

#[tokio::test]
async fn fresh_mirror_is_skipped() {
    // No pages scripted: a fetch attempt would fail the test.
    let platform = MockPlatform::new();
    let store = MockFlockStore::new()
        .with_identity(10, 1000)
        .with_leader_edge(10, 99)
        .with_synced_at(10, EdgeDirection::Leaders, Utc::now() - Duration::hours(1));
    let sync = GraphSync::new(&platform, &store, "t");

    let synced = sync
        .sync_edges(10, EdgeDirection::Leaders, Duration::days(3))
        .await
        .unwrap();

    assert!(!synced);
    assert!(store.leader_ids_of(10).contains(&99));
}

#[tokio::test]
async fn stale_mirror_is_rewalked() {
    let platform = MockPlatform::new().with_leaders(1000, &[2000]);
    let store = MockFlockStore::new()
        .with_identity(10, 1000)
        .with_synced_at(10, EdgeDirection::Leaders, Utc::now() - Duration::days(4));
    let sync = GraphSync::new(&platform, &store, "t");

    let synced = sync
        .sync_edges(10, EdgeDirection::Leaders, Duration::days(3))
        .await
        .unwrap();

    assert!(synced);
    let a = store.local_id(2000).unwrap();
    assert_eq!(store.leader_ids_of(10), [a].into_iter().collect());
}

#[tokio::test]
async fn watermark_prunes_edges_the_walk_did_not_see() {
    // Mirror holds {A, C}; the platform now reports {A, B}.
    let platform = MockPlatform::new().with_leaders(1000, &[2000, 2100]);
    let store = MockFlockStore::new()
        .with_identity(10, 1000)
        .with_identity(20, 2000)
        .with_identity(21, 2100)
        .with_identity(22, 2200);
    let old = Utc::now() - Duration::hours(1);
    store
        .touch_edges(EdgeDirection::Leaders, 10, &[20, 22], old)
        .await
        .unwrap();
    let sync = GraphSync::new(&platform, &store, "t");

    sync.sync_edges(10, EdgeDirection::Leaders, Duration::days(3))
        .await
        .unwrap();

    // Exactly {A, B}: C pruned, A restamped, B added.
    assert_eq!(store.leader_ids_of(10), [20, 21].into_iter().collect());
}

#[tokio::test]
async fn cursor_walk_spans_pages() {
    let platform = MockPlatform::new()
        .on_leader_page(1000, IdPage::FIRST, page(&[2000, 2001], 5))
        .on_leader_page(1000, 5, single_page(&[2002]));
    let store = MockFlockStore::new().with_identity(10, 1000);
    let sync = GraphSync::new(&platform, &store, "t");

    sync.sync_edges(10, EdgeDirection::Leaders, Duration::days(3))
        .await
        .unwrap();

    assert_eq!(store.leader_ids_of(10).len(), 3);
}

#[tokio::test]
async fn interrupted_walk_leaves_mirror_and_stamp_intact() {
    // Page one points at cursor 7, which is not scripted.
    let platform = MockPlatform::new().on_leader_page(1000, IdPage::FIRST, page(&[2000], 7));
    let old_stamp = Utc::now() - Duration::days(4);
    let store = MockFlockStore::new()
        .with_identity(10, 1000)
        .with_identity(22, 2200)
        .with_synced_at(10, EdgeDirection::Leaders, old_stamp);
    store
        .touch_edges(EdgeDirection::Leaders, 10, &[22], Utc::now() - Duration::hours(1))
        .await
        .unwrap();

    {
        let sync = GraphSync::new(&platform, &store, "t");
        let result = sync
            .sync_edges(10, EdgeDirection::Leaders, Duration::days(3))
            .await;
        assert!(result.is_err());
    }

    // Nothing pruned, sync time not advanced: the pass never completed.
    assert!(store.leader_ids_of(10).contains(&22));
    let owner = store.identity_for_api(1000).unwrap();
    assert_eq!(owner.leaders_synced_at, Some(old_stamp));

    // The next attempt restarts from the first page and finishes the job.
    let platform = platform.on_leader_page(1000, 7, single_page(&[2100]));
    let sync = GraphSync::new(&platform, &store, "t");
    let synced = sync
        .sync_edges(10, EdgeDirection::Leaders, Duration::days(3))
        .await
        .unwrap();

    assert!(synced);
    let a = store.local_id(2000).unwrap();
    let b = store.local_id(2100).unwrap();
    assert_eq!(store.leader_ids_of(10), [a, b].into_iter().collect());
}

// ---------------------------------------------------------------------------
// ListMirror
// ---------------------------------------------------------------------------

#[tokio::test]
async fn keeper_list_is_created_on_first_use() {
    let platform = MockPlatform::new();
    let store = MockFlockStore::new();
    let lists = ListMirror::new(&platform, &store, "t", "wren", 5000, 100);

    let keepers = lists.keeper_ids().await.unwrap();

    assert!(keepers.is_empty());
    assert_eq!(platform.created_lists(), vec!["flock-keepers".to_string()]);
}

#[tokio::test]
async fn keeper_members_resolve_to_local_ids() {
    let platform = MockPlatform::new().with_list("flock-keepers", &[2000, 2100]);
    let store = MockFlockStore::new();
    let lists = ListMirror::new(&platform, &store, "t", "wren", 5000, 100);

    let keepers = lists.keeper_ids().await.unwrap();

    let a = store.local_id(2000).unwrap();
    let b = store.local_id(2100).unwrap();
    assert_eq!(keepers, [a, b].into_iter().collect());
    assert!(platform.created_lists().is_empty());
}

#[tokio::test]
async fn outsider_list_converges_on_the_wanted_set() {
    let platform = MockPlatform::new().with_list("flock-outsiders", &[2200, 2300]);
    let store = MockFlockStore::new()
        .with_identity(20, 2000)
        .with_identity(21, 2100);
    let lists = ListMirror::new(&platform, &store, "t", "wren", 5000, 100);

    let outsiders = [20, 21].into_iter().collect();
    lists.sync_outsiders(&outsiders).await.unwrap();

    let mut members = platform.list_member_ids("flock-outsiders");
    members.sort_unstable();
    assert_eq!(members, vec![2000, 2100]);
}

#[tokio::test]
async fn outsider_changes_are_pushed_in_batches() {
    let platform = MockPlatform::new().with_list("flock-outsiders", &[]);
    let store = MockFlockStore::new()
        .with_identity(20, 2000)
        .with_identity(21, 2100)
        .with_identity(22, 2200)
        .with_identity(23, 2300)
        .with_identity(24, 2400);
    let lists = ListMirror::new(&platform, &store, "t", "wren", 5000, 2);

    let outsiders = [20, 21, 22, 23, 24].into_iter().collect();
    lists.sync_outsiders(&outsiders).await.unwrap();

    let batches = platform.add_batches("flock-outsiders");
    assert_eq!(batches.len(), 3);
    assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 5);
    assert!(batches.iter().all(|b| b.len() <= 2));
    assert_eq!(platform.list_member_ids("flock-outsiders").len(), 5);
}
