// Test mocks for the tending loop.
//
// Two mocks matching the two trait boundaries:
// - MockPlatform (Platform) — scripted pages, lists, and follow endpoints,
//   recording every write it receives
// - MockFlockStore (FlockStore) — stateful in-memory mirror and ledgers
//
// Plus small fixture helpers for accounts and id pages.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use flock_common::{Account, EdgeDirection, FollowRecord, Identity, UnfollowRecord};
use roost_client::{IdPage, RoostError, RoostUser};

use crate::traits::{FlockStore, Platform};

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

/// A managed account fixture.
pub fn account(id: i64, screen_name: &str, identity_id: i64) -> Account {
    Account {
        id,
        screen_name: screen_name.to_string(),
        identity_id,
        access_token: format!("token-{id}"),
    }
}

/// A page in a cursored id walk. `next_cursor` of zero ends the walk.
pub fn page(ids: &[i64], next_cursor: i64) -> IdPage {
    IdPage {
        ids: ids.to_vec(),
        next_cursor,
        previous_cursor: 0,
    }
}

/// A single terminal page holding the whole id set.
pub fn single_page(ids: &[i64]) -> IdPage {
    page(ids, 0)
}

fn user(api_id: i64) -> RoostUser {
    RoostUser {
        id: api_id,
        screen_name: format!("user{api_id}"),
    }
}

// ---------------------------------------------------------------------------
// MockPlatform
// ---------------------------------------------------------------------------

struct MockPlatformInner {
    /// (api_id, cursor) → page for leader walks.
    leader_pages: HashMap<(i64, i64), IdPage>,
    /// (api_id, cursor) → page for follower walks.
    follower_pages: HashMap<(i64, i64), IdPage>,
    /// slug → current members. Reads of an absent slug return not-found.
    lists: HashMap<String, Vec<RoostUser>>,
    /// api ids the platform no longer knows; every call naming one 404s.
    missing: HashSet<i64>,
    /// api ids `create_follow` refuses with a 403.
    forbidden_follows: HashSet<i64>,
    created_lists: Vec<String>,
    follow_calls: Vec<i64>,
    unfollow_calls: Vec<i64>,
    add_batches: Vec<(String, Vec<i64>)>,
    remove_batches: Vec<(String, Vec<i64>)>,
}

/// Scripted platform mock. Page walks and list reads must be registered up
/// front; unscripted pages fail with a server error, which doubles as the
/// interrupted-pagination fixture. Builder pattern: `.on_leader_page()`,
/// `.with_followers()`, `.with_list()`, `.missing_user()` and friends.
pub struct MockPlatform {
    inner: Mutex<MockPlatformInner>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockPlatformInner {
                leader_pages: HashMap::new(),
                follower_pages: HashMap::new(),
                lists: HashMap::new(),
                missing: HashSet::new(),
                forbidden_follows: HashSet::new(),
                created_lists: Vec::new(),
                follow_calls: Vec::new(),
                unfollow_calls: Vec::new(),
                add_batches: Vec::new(),
                remove_batches: Vec::new(),
            }),
        }
    }

    pub fn on_leader_page(self, api_id: i64, cursor: i64, page: IdPage) -> Self {
        self.inner
            .lock()
            .unwrap()
            .leader_pages
            .insert((api_id, cursor), page);
        self
    }

    pub fn on_follower_page(self, api_id: i64, cursor: i64, page: IdPage) -> Self {
        self.inner
            .lock()
            .unwrap()
            .follower_pages
            .insert((api_id, cursor), page);
        self
    }

    /// Script a one-page leader walk for `api_id`.
    pub fn with_leaders(self, api_id: i64, ids: &[i64]) -> Self {
        self.on_leader_page(api_id, IdPage::FIRST, single_page(ids))
    }

    /// Script a one-page follower walk for `api_id`.
    pub fn with_followers(self, api_id: i64, ids: &[i64]) -> Self {
        self.on_follower_page(api_id, IdPage::FIRST, single_page(ids))
    }

    /// Pre-create a list with the given member api ids.
    pub fn with_list(self, slug: &str, member_api_ids: &[i64]) -> Self {
        self.inner.lock().unwrap().lists.insert(
            slug.to_string(),
            member_api_ids.iter().map(|&id| user(id)).collect(),
        );
        self
    }

    /// Make every call naming `api_id` fail with not-found.
    pub fn missing_user(self, api_id: i64) -> Self {
        self.inner.lock().unwrap().missing.insert(api_id);
        self
    }

    /// Make `create_follow` for `api_id` fail with forbidden.
    pub fn forbid_follow(self, api_id: i64) -> Self {
        self.inner.lock().unwrap().forbidden_follows.insert(api_id);
        self
    }

    // --- Assertion helpers ---

    pub fn follow_calls(&self) -> Vec<i64> {
        self.inner.lock().unwrap().follow_calls.clone()
    }

    pub fn unfollow_calls(&self) -> Vec<i64> {
        self.inner.lock().unwrap().unfollow_calls.clone()
    }

    /// Follow plus unfollow calls that reached the platform.
    pub fn action_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.follow_calls.len() + inner.unfollow_calls.len()
    }

    pub fn created_lists(&self) -> Vec<String> {
        self.inner.lock().unwrap().created_lists.clone()
    }

    /// Current members of a list, as the platform now sees it.
    pub fn list_member_ids(&self, slug: &str) -> Vec<i64> {
        self.inner
            .lock()
            .unwrap()
            .lists
            .get(slug)
            .map(|members| members.iter().map(|m| m.id).collect())
            .unwrap_or_default()
    }

    /// Every add batch pushed to `slug`, in call order.
    pub fn add_batches(&self, slug: &str) -> Vec<Vec<i64>> {
        self.inner
            .lock()
            .unwrap()
            .add_batches
            .iter()
            .filter(|(s, _)| s == slug)
            .map(|(_, ids)| ids.clone())
            .collect()
    }

    /// Every remove batch pushed to `slug`, in call order.
    pub fn remove_batches(&self, slug: &str) -> Vec<Vec<i64>> {
        self.inner
            .lock()
            .unwrap()
            .remove_batches
            .iter()
            .filter(|(s, _)| s == slug)
            .map(|(_, ids)| ids.clone())
            .collect()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn leader_ids_page(
        &self,
        _token: &str,
        user_api_id: i64,
        cursor: i64,
    ) -> roost_client::Result<IdPage> {
        let inner = self.inner.lock().unwrap();
        if inner.missing.contains(&user_api_id) {
            return Err(RoostError::NotFound(format!("user {user_api_id}")));
        }
        inner
            .leader_pages
            .get(&(user_api_id, cursor))
            .cloned()
            .ok_or_else(|| RoostError::Api {
                status: 500,
                message: format!("no leader page scripted for {user_api_id} at {cursor}"),
            })
    }

    async fn follower_ids_page(
        &self,
        _token: &str,
        user_api_id: i64,
        cursor: i64,
    ) -> roost_client::Result<IdPage> {
        let inner = self.inner.lock().unwrap();
        if inner.missing.contains(&user_api_id) {
            return Err(RoostError::NotFound(format!("user {user_api_id}")));
        }
        inner
            .follower_pages
            .get(&(user_api_id, cursor))
            .cloned()
            .ok_or_else(|| RoostError::Api {
                status: 500,
                message: format!("no follower page scripted for {user_api_id} at {cursor}"),
            })
    }

    async fn list_members(
        &self,
        _token: &str,
        _owner: &str,
        slug: &str,
        _count: i64,
    ) -> roost_client::Result<Vec<RoostUser>> {
        self.inner
            .lock()
            .unwrap()
            .lists
            .get(slug)
            .cloned()
            .ok_or_else(|| RoostError::NotFound(format!("list {slug}")))
    }

    async fn create_list(
        &self,
        _token: &str,
        name: &str,
        _description: &str,
    ) -> roost_client::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        // The platform derives the slug from the name.
        let slug = name.replace(' ', "-");
        inner.created_lists.push(slug.clone());
        inner.lists.entry(slug).or_default();
        Ok(())
    }

    async fn add_list_members(
        &self,
        _token: &str,
        _owner: &str,
        slug: &str,
        api_ids: &[i64],
    ) -> roost_client::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .add_batches
            .push((slug.to_string(), api_ids.to_vec()));
        let Some(members) = inner.lists.get_mut(slug) else {
            return Err(RoostError::NotFound(format!("list {slug}")));
        };
        for &api_id in api_ids {
            if !members.iter().any(|m| m.id == api_id) {
                members.push(user(api_id));
            }
        }
        Ok(())
    }

    async fn remove_list_members(
        &self,
        _token: &str,
        _owner: &str,
        slug: &str,
        api_ids: &[i64],
    ) -> roost_client::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .remove_batches
            .push((slug.to_string(), api_ids.to_vec()));
        let Some(members) = inner.lists.get_mut(slug) else {
            return Err(RoostError::NotFound(format!("list {slug}")));
        };
        members.retain(|m| !api_ids.contains(&m.id));
        Ok(())
    }

    async fn create_follow(&self, _token: &str, api_id: i64) -> roost_client::Result<RoostUser> {
        let mut inner = self.inner.lock().unwrap();
        if inner.missing.contains(&api_id) {
            return Err(RoostError::NotFound(format!("user {api_id}")));
        }
        if inner.forbidden_follows.contains(&api_id) {
            return Err(RoostError::Forbidden(format!("user {api_id}")));
        }
        inner.follow_calls.push(api_id);
        Ok(user(api_id))
    }

    async fn destroy_follow(&self, _token: &str, api_id: i64) -> roost_client::Result<RoostUser> {
        let mut inner = self.inner.lock().unwrap();
        if inner.missing.contains(&api_id) {
            return Err(RoostError::NotFound(format!("user {api_id}")));
        }
        inner.unfollow_calls.push(api_id);
        Ok(user(api_id))
    }
}

// ---------------------------------------------------------------------------
// MockFlockStore
// ---------------------------------------------------------------------------

struct MockFlockStoreInner {
    identities: HashMap<i64, Identity>,
    by_api_id: HashMap<i64, i64>,
    next_identity_id: i64,
    /// account id → mentor identity ids
    mentors: HashMap<i64, Vec<i64>>,
    /// owner id → target id → last_seen
    leader_edges: HashMap<i64, HashMap<i64, DateTime<Utc>>>,
    /// owner id → follower id → last_seen
    follower_edges: HashMap<i64, HashMap<i64, DateTime<Utc>>>,
    follows: HashMap<i64, Vec<FollowRecord>>,
    unfollows: HashMap<i64, Vec<UnfollowRecord>>,
}

impl MockFlockStoreInner {
    fn edges_mut(
        &mut self,
        direction: EdgeDirection,
    ) -> &mut HashMap<i64, HashMap<i64, DateTime<Utc>>> {
        match direction {
            EdgeDirection::Leaders => &mut self.leader_edges,
            EdgeDirection::Followers => &mut self.follower_edges,
        }
    }

    fn edges(&self, direction: EdgeDirection) -> &HashMap<i64, HashMap<i64, DateTime<Utc>>> {
        match direction {
            EdgeDirection::Leaders => &self.leader_edges,
            EdgeDirection::Followers => &self.follower_edges,
        }
    }
}

/// Stateful in-memory store mock. Thread-safe via interior Mutex; the same
/// watermark and append-only ledger semantics as the real store.
pub struct MockFlockStore {
    inner: Mutex<MockFlockStoreInner>,
}

impl MockFlockStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockFlockStoreInner {
                identities: HashMap::new(),
                by_api_id: HashMap::new(),
                next_identity_id: 1,
                mentors: HashMap::new(),
                leader_edges: HashMap::new(),
                follower_edges: HashMap::new(),
                follows: HashMap::new(),
                unfollows: HashMap::new(),
            }),
        }
    }

    /// Register an identity under an explicit local id.
    pub fn with_identity(self, id: i64, api_id: i64) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.identities.insert(
                id,
                Identity {
                    id,
                    api_id,
                    screen_name: None,
                    leaders_synced_at: None,
                    followers_synced_at: None,
                },
            );
            inner.by_api_id.insert(api_id, id);
            inner.next_identity_id = inner.next_identity_id.max(id + 1);
        }
        self
    }

    pub fn with_screen_name(self, api_id: i64, screen_name: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(&id) = inner.by_api_id.get(&api_id) {
                if let Some(identity) = inner.identities.get_mut(&id) {
                    identity.screen_name = Some(screen_name.to_string());
                }
            }
        }
        self
    }

    pub fn with_mentor(self, account_id: i64, identity_id: i64) -> Self {
        self.inner
            .lock()
            .unwrap()
            .mentors
            .entry(account_id)
            .or_default()
            .push(identity_id);
        self
    }

    pub fn with_leader_edge(self, owner_id: i64, target_id: i64) -> Self {
        self.inner
            .lock()
            .unwrap()
            .leader_edges
            .entry(owner_id)
            .or_default()
            .insert(target_id, Utc::now());
        self
    }

    pub fn with_follower_edge(self, owner_id: i64, follower_id: i64) -> Self {
        self.inner
            .lock()
            .unwrap()
            .follower_edges
            .entry(owner_id)
            .or_default()
            .insert(follower_id, Utc::now());
        self
    }

    pub fn with_follow(self, account_id: i64, leader_id: i64, time: DateTime<Utc>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .follows
            .entry(account_id)
            .or_default()
            .push(FollowRecord { leader_id, time });
        self
    }

    pub fn with_unfollow(self, account_id: i64, leader_id: i64, time: DateTime<Utc>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .unfollows
            .entry(account_id)
            .or_default()
            .push(UnfollowRecord { leader_id, time });
        self
    }

    /// Stamp one side of an identity's mirror as synced at `at`.
    pub fn with_synced_at(self, identity_id: i64, direction: EdgeDirection, at: DateTime<Utc>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(identity) = inner.identities.get_mut(&identity_id) {
                match direction {
                    EdgeDirection::Leaders => identity.leaders_synced_at = Some(at),
                    EdgeDirection::Followers => identity.followers_synced_at = Some(at),
                }
            }
        }
        self
    }

    // --- Assertion helpers ---

    pub fn leader_ids_of(&self, owner_id: i64) -> HashSet<i64> {
        self.inner
            .lock()
            .unwrap()
            .leader_edges
            .get(&owner_id)
            .map(|edges| edges.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn follower_ids_of(&self, owner_id: i64) -> HashSet<i64> {
        self.inner
            .lock()
            .unwrap()
            .follower_edges
            .get(&owner_id)
            .map(|edges| edges.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn follow_records(&self, account_id: i64) -> Vec<FollowRecord> {
        self.inner
            .lock()
            .unwrap()
            .follows
            .get(&account_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn unfollow_records(&self, account_id: i64) -> Vec<UnfollowRecord> {
        self.inner
            .lock()
            .unwrap()
            .unfollows
            .get(&account_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn identity_for_api(&self, api_id: i64) -> Option<Identity> {
        let inner = self.inner.lock().unwrap();
        let id = inner.by_api_id.get(&api_id)?;
        inner.identities.get(id).cloned()
    }

    pub fn local_id(&self, api_id: i64) -> Option<i64> {
        self.inner.lock().unwrap().by_api_id.get(&api_id).copied()
    }
}

#[async_trait]
impl FlockStore for MockFlockStore {
    async fn mentors(&self, account_id: i64) -> Result<Vec<Identity>> {
        let inner = self.inner.lock().unwrap();
        let ids = inner.mentors.get(&account_id).cloned().unwrap_or_default();
        ids.iter()
            .map(|id| {
                inner
                    .identities
                    .get(id)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("MockFlockStore: no identity {id}"))
            })
            .collect()
    }

    async fn identity(&self, id: i64) -> Result<Identity> {
        match self.inner.lock().unwrap().identities.get(&id) {
            Some(identity) => Ok(identity.clone()),
            None => bail!("MockFlockStore: no identity {id}"),
        }
    }

    async fn upsert_api_ids(&self, api_ids: &[i64]) -> Result<Vec<i64>> {
        let mut inner = self.inner.lock().unwrap();
        let mut ids = Vec::with_capacity(api_ids.len());
        for &api_id in api_ids {
            let id = match inner.by_api_id.get(&api_id) {
                Some(&id) => id,
                None => {
                    let id = inner.next_identity_id;
                    inner.next_identity_id += 1;
                    inner.identities.insert(
                        id,
                        Identity {
                            id,
                            api_id,
                            screen_name: None,
                            leaders_synced_at: None,
                            followers_synced_at: None,
                        },
                    );
                    inner.by_api_id.insert(api_id, id);
                    id
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    async fn identities_by_ids(&self, ids: &[i64]) -> Result<Vec<Identity>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.identities.get(id).cloned())
            .collect())
    }

    async fn note_screen_name(&self, api_id: i64, screen_name: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&id) = inner.by_api_id.get(&api_id) {
            if let Some(identity) = inner.identities.get_mut(&id) {
                identity.screen_name = Some(screen_name.to_string());
            }
        }
        Ok(())
    }

    async fn touch_edges(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        targets: &[i64],
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let edges = inner.edges_mut(direction).entry(owner_id).or_default();
        for &target in targets {
            edges.insert(target, seen_at);
        }
        Ok(())
    }

    async fn prune_edges(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        seen_before: DateTime<Utc>,
    ) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let Some(edges) = inner.edges_mut(direction).get_mut(&owner_id) else {
            return Ok(0);
        };
        let before = edges.len();
        edges.retain(|_, last_seen| *last_seen >= seen_before);
        Ok((before - edges.len()) as u64)
    }

    async fn mark_synced(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(identity) = inner.identities.get_mut(&owner_id) {
            match direction {
                EdgeDirection::Leaders => identity.leaders_synced_at = Some(at),
                EdgeDirection::Followers => identity.followers_synced_at = Some(at),
            }
        }
        Ok(())
    }

    async fn edge_ids(&self, direction: EdgeDirection, owner_id: i64) -> Result<HashSet<i64>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .edges(direction)
            .get(&owner_id)
            .map(|edges| edges.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn insert_follower_edge(
        &self,
        owner_id: i64,
        follower_id: i64,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .follower_edges
            .entry(owner_id)
            .or_default()
            .insert(follower_id, seen_at);
        Ok(())
    }

    async fn delete_follower_edge(&self, owner_id: i64, follower_id: i64) -> Result<()> {
        if let Some(edges) = self.inner.lock().unwrap().follower_edges.get_mut(&owner_id) {
            edges.remove(&follower_id);
        }
        Ok(())
    }

    async fn follower_edge_exists(&self, owner_id: i64, follower_id: i64) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .follower_edges
            .get(&owner_id)
            .is_some_and(|edges| edges.contains_key(&follower_id)))
    }

    async fn follows(&self, account_id: i64) -> Result<Vec<FollowRecord>> {
        let mut records = self
            .inner
            .lock()
            .unwrap()
            .follows
            .get(&account_id)
            .cloned()
            .unwrap_or_default();
        records.sort_by_key(|f| f.time);
        Ok(records)
    }

    async fn follow(&self, account_id: i64, leader_id: i64) -> Result<Option<FollowRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .follows
            .get(&account_id)
            .and_then(|records| records.iter().find(|f| f.leader_id == leader_id).copied()))
    }

    async fn last_follow_time(&self, account_id: i64) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .follows
            .get(&account_id)
            .and_then(|records| records.iter().map(|f| f.time).max()))
    }

    async fn follows_since(&self, account_id: i64, since: DateTime<Utc>) -> Result<i64> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .follows
            .get(&account_id)
            .map(|records| records.iter().filter(|f| f.time > since).count() as i64)
            .unwrap_or(0))
    }

    async fn add_follow(&self, account_id: i64, leader_id: i64, time: DateTime<Utc>) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .follows
            .entry(account_id)
            .or_default()
            .push(FollowRecord { leader_id, time });
        Ok(())
    }

    async fn unfollow(&self, account_id: i64, leader_id: i64) -> Result<Option<UnfollowRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .unfollows
            .get(&account_id)
            .and_then(|records| records.iter().find(|u| u.leader_id == leader_id).copied()))
    }

    async fn unfollowed_leader_ids(&self, account_id: i64) -> Result<HashSet<i64>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .unfollows
            .get(&account_id)
            .map(|records| records.iter().map(|u| u.leader_id).collect())
            .unwrap_or_default())
    }

    async fn add_unfollow(
        &self,
        account_id: i64,
        leader_id: i64,
        time: DateTime<Utc>,
    ) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .unfollows
            .entry(account_id)
            .or_default()
            .push(UnfollowRecord { leader_id, time });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock self-tests
// ---------------------------------------------------------------------------
