// Trait abstractions for the tending loop's two dependencies.
//
// Platform — the Roost REST surface the tender touches, behind one trait.
// FlockStore — the Postgres mirror and ledgers, read and written per cycle.
//
// These enable deterministic testing with MockPlatform and MockFlockStore:
// no network, no database. `cargo test` in seconds.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use flock_common::{EdgeDirection, FollowRecord, Identity, UnfollowRecord};
use roost_client::{IdPage, RoostUser};

// ---------------------------------------------------------------------------
// Platform — replaces RoostClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Platform: Send + Sync {
    /// One page of the api ids a user follows.
    async fn leader_ids_page(
        &self,
        token: &str,
        user_api_id: i64,
        cursor: i64,
    ) -> roost_client::Result<IdPage>;

    /// One page of the api ids following a user.
    async fn follower_ids_page(
        &self,
        token: &str,
        user_api_id: i64,
        cursor: i64,
    ) -> roost_client::Result<IdPage>;

    /// Members of a slug-addressed list owned by `owner`.
    async fn list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        count: i64,
    ) -> roost_client::Result<Vec<RoostUser>>;

    /// Create a private list. The platform derives the slug from the name.
    async fn create_list(
        &self,
        token: &str,
        name: &str,
        description: &str,
    ) -> roost_client::Result<()>;

    async fn add_list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        api_ids: &[i64],
    ) -> roost_client::Result<()>;

    async fn remove_list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        api_ids: &[i64],
    ) -> roost_client::Result<()>;

    /// Follow a user. Returns the followed user's profile.
    async fn create_follow(&self, token: &str, api_id: i64) -> roost_client::Result<RoostUser>;

    /// Unfollow a user. Returns the unfollowed user's profile.
    async fn destroy_follow(&self, token: &str, api_id: i64) -> roost_client::Result<RoostUser>;
}

#[async_trait]
impl Platform for roost_client::RoostClient {
    async fn leader_ids_page(
        &self,
        token: &str,
        user_api_id: i64,
        cursor: i64,
    ) -> roost_client::Result<IdPage> {
        self.leader_ids_page(token, user_api_id, cursor).await
    }

    async fn follower_ids_page(
        &self,
        token: &str,
        user_api_id: i64,
        cursor: i64,
    ) -> roost_client::Result<IdPage> {
        self.follower_ids_page(token, user_api_id, cursor).await
    }

    async fn list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        count: i64,
    ) -> roost_client::Result<Vec<RoostUser>> {
        self.list_members(token, owner, slug, count).await
    }

    async fn create_list(
        &self,
        token: &str,
        name: &str,
        description: &str,
    ) -> roost_client::Result<()> {
        self.create_list(token, name, "private", description).await?;
        Ok(())
    }

    async fn add_list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        api_ids: &[i64],
    ) -> roost_client::Result<()> {
        self.add_list_members(token, owner, slug, api_ids).await
    }

    async fn remove_list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        api_ids: &[i64],
    ) -> roost_client::Result<()> {
        self.remove_list_members(token, owner, slug, api_ids).await
    }

    async fn create_follow(&self, token: &str, api_id: i64) -> roost_client::Result<RoostUser> {
        self.create_follow(token, api_id).await
    }

    async fn destroy_follow(&self, token: &str, api_id: i64) -> roost_client::Result<RoostUser> {
        self.destroy_follow(token, api_id).await
    }
}

// ---------------------------------------------------------------------------
// FlockStore — mirror and ledger access
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FlockStore: Send + Sync {
    // --- Identities ---

    /// Mentor identities configured for an account.
    async fn mentors(&self, account_id: i64) -> Result<Vec<Identity>>;

    /// Look up a single identity by local id.
    async fn identity(&self, id: i64) -> Result<Identity>;

    /// Map observed platform ids to local identity ids, inserting rows for
    /// ids seen for the first time. Returned ids are unordered.
    async fn upsert_api_ids(&self, api_ids: &[i64]) -> Result<Vec<i64>>;

    /// Resolve local identity ids back to their platform api ids.
    async fn identities_by_ids(&self, ids: &[i64]) -> Result<Vec<Identity>>;

    /// Record a screen name learned in passing from an API response.
    async fn note_screen_name(&self, api_id: i64, screen_name: &str) -> Result<()>;

    // --- Edge mirror ---

    async fn touch_edges(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        targets: &[i64],
        seen_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete edges not stamped by the current pass. Returns the count.
    async fn prune_edges(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        seen_before: DateTime<Utc>,
    ) -> Result<u64>;

    async fn mark_synced(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn edge_ids(&self, direction: EdgeDirection, owner_id: i64) -> Result<HashSet<i64>>;

    async fn insert_follower_edge(
        &self,
        owner_id: i64,
        follower_id: i64,
        seen_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn delete_follower_edge(&self, owner_id: i64, follower_id: i64) -> Result<()>;

    async fn follower_edge_exists(&self, owner_id: i64, follower_id: i64) -> Result<bool>;

    // --- Ledgers ---

    /// Every follow the account has performed, oldest first.
    async fn follows(&self, account_id: i64) -> Result<Vec<FollowRecord>>;

    async fn follow(&self, account_id: i64, leader_id: i64) -> Result<Option<FollowRecord>>;

    async fn last_follow_time(&self, account_id: i64) -> Result<Option<DateTime<Utc>>>;

    /// Count of follows performed strictly after `since`.
    async fn follows_since(&self, account_id: i64, since: DateTime<Utc>) -> Result<i64>;

    async fn add_follow(&self, account_id: i64, leader_id: i64, time: DateTime<Utc>) -> Result<()>;

    async fn unfollow(&self, account_id: i64, leader_id: i64) -> Result<Option<UnfollowRecord>>;

    async fn unfollowed_leader_ids(&self, account_id: i64) -> Result<HashSet<i64>>;

    async fn add_unfollow(
        &self,
        account_id: i64,
        leader_id: i64,
        time: DateTime<Utc>,
    ) -> Result<()>;
}

#[async_trait]
impl FlockStore for flock_store::Store {
    async fn mentors(&self, account_id: i64) -> Result<Vec<Identity>> {
        self.mentors(account_id).await
    }

    async fn identity(&self, id: i64) -> Result<Identity> {
        self.identity(id).await
    }

    async fn upsert_api_ids(&self, api_ids: &[i64]) -> Result<Vec<i64>> {
        self.upsert_api_ids(api_ids).await
    }

    async fn identities_by_ids(&self, ids: &[i64]) -> Result<Vec<Identity>> {
        self.identities_by_ids(ids).await
    }

    async fn note_screen_name(&self, api_id: i64, screen_name: &str) -> Result<()> {
        self.note_screen_name(api_id, screen_name).await
    }

    async fn touch_edges(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        targets: &[i64],
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        self.touch_edges(direction, owner_id, targets, seen_at).await
    }

    async fn prune_edges(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        seen_before: DateTime<Utc>,
    ) -> Result<u64> {
        self.prune_edges(direction, owner_id, seen_before).await
    }

    async fn mark_synced(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.mark_synced(direction, owner_id, at).await
    }

    async fn edge_ids(&self, direction: EdgeDirection, owner_id: i64) -> Result<HashSet<i64>> {
        self.edge_ids(direction, owner_id).await
    }

    async fn insert_follower_edge(
        &self,
        owner_id: i64,
        follower_id: i64,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        self.insert_follower_edge(owner_id, follower_id, seen_at)
            .await
    }

    async fn delete_follower_edge(&self, owner_id: i64, follower_id: i64) -> Result<()> {
        self.delete_follower_edge(owner_id, follower_id).await
    }

    async fn follower_edge_exists(&self, owner_id: i64, follower_id: i64) -> Result<bool> {
        self.follower_edge_exists(owner_id, follower_id).await
    }

    async fn follows(&self, account_id: i64) -> Result<Vec<FollowRecord>> {
        self.follows(account_id).await
    }

    async fn follow(&self, account_id: i64, leader_id: i64) -> Result<Option<FollowRecord>> {
        self.follow(account_id, leader_id).await
    }

    async fn last_follow_time(&self, account_id: i64) -> Result<Option<DateTime<Utc>>> {
        self.last_follow_time(account_id).await
    }

    async fn follows_since(&self, account_id: i64, since: DateTime<Utc>) -> Result<i64> {
        self.follows_since(account_id, since).await
    }

    async fn add_follow(&self, account_id: i64, leader_id: i64, time: DateTime<Utc>) -> Result<()> {
        self.add_follow(account_id, leader_id, time).await
    }

    async fn unfollow(&self, account_id: i64, leader_id: i64) -> Result<Option<UnfollowRecord>> {
        self.unfollow(account_id, leader_id).await
    }

    async fn unfollowed_leader_ids(&self, account_id: i64) -> Result<HashSet<i64>> {
        self.unfollowed_leader_ids(account_id).await
    }

    async fn add_unfollow(
        &self,
        account_id: i64,
        leader_id: i64,
        time: DateTime<Utc>,
    ) -> Result<()> {
        self.add_unfollow(account_id, leader_id, time).await
    }
}
