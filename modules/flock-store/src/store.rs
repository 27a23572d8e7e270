//! Store — the engine's memory between cycles, backed by Postgres.
//!
//! Edge tables mirror the platform graph and may lag it; the follow and
//! unfollow ledgers are append-only and never lag. Rows are turned into
//! value types here at the boundary, so callers never touch raw rows.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use flock_common::{Account, EdgeDirection, FollowRecord, Identity, UnfollowRecord};

// ---------------------------------------------------------------------------
// Direction mapping
// ---------------------------------------------------------------------------

fn edge_table(direction: EdgeDirection) -> &'static str {
    match direction {
        EdgeDirection::Leaders => "leader_edges",
        EdgeDirection::Followers => "follower_edges",
    }
}

fn target_column(direction: EdgeDirection) -> &'static str {
    match direction {
        EdgeDirection::Leaders => "leader_id",
        EdgeDirection::Followers => "follower_id",
    }
}

fn synced_column(direction: EdgeDirection) -> &'static str {
    match direction {
        EdgeDirection::Leaders => "leaders_synced_at",
        EdgeDirection::Followers => "followers_synced_at",
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

type IdentityRow = (
    i64,
    i64,
    Option<String>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

fn identity_from_row(row: IdentityRow) -> Identity {
    let (id, api_id, screen_name, leaders_synced_at, followers_synced_at) = row;
    Identity {
        id,
        api_id,
        screen_name,
        leaders_synced_at,
        followers_synced_at,
    }
}

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- Accounts and mentors ---

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, (i64, String, i64, String)>(
            r#"
            SELECT id, screen_name, identity_id, access_token
            FROM accounts
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, screen_name, identity_id, access_token)| Account {
                id,
                screen_name,
                identity_id,
                access_token,
            })
            .collect())
    }

    pub async fn mentors(&self, account_id: i64) -> Result<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT i.id, i.api_id, i.screen_name, i.leaders_synced_at, i.followers_synced_at
            FROM mentors m
            JOIN identities i ON i.id = m.identity_id
            WHERE m.account_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(identity_from_row).collect())
    }

    // --- Identities ---

    pub async fn identity(&self, id: i64) -> Result<Identity> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, api_id, screen_name, leaders_synced_at, followers_synced_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(identity_from_row(row))
    }

    pub async fn identities_by_ids(&self, ids: &[i64]) -> Result<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, api_id, screen_name, leaders_synced_at, followers_synced_at
            FROM identities
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(identity_from_row).collect())
    }

    /// Map observed platform ids to local identity ids, inserting a row for
    /// any id seen for the first time. Returned ids are unordered.
    pub async fn upsert_api_ids(&self, api_ids: &[i64]) -> Result<Vec<i64>> {
        if api_ids.is_empty() {
            return Ok(Vec::new());
        }

        // DO UPDATE instead of DO NOTHING so RETURNING covers existing rows.
        let rows = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO identities (api_id)
            SELECT t.api_id FROM UNNEST($1::BIGINT[]) AS t(api_id)
            ON CONFLICT (api_id) DO UPDATE SET api_id = EXCLUDED.api_id
            RETURNING id
            "#,
        )
        .bind(api_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Record a screen name learned in passing from an API response.
    pub async fn note_screen_name(&self, api_id: i64, screen_name: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE identities SET screen_name = $2 WHERE api_id = $1
            "#,
        )
        .bind(api_id)
        .bind(screen_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // --- Edge mirror ---

    /// Upsert a batch of edges, stamping each with `seen_at`.
    pub async fn touch_edges(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        targets: &[i64],
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }

        let sql = format!(
            r#"
            INSERT INTO {table} (owner_id, {target}, last_seen)
            SELECT $1, t.id, $3 FROM UNNEST($2::BIGINT[]) AS t(id)
            ON CONFLICT (owner_id, {target}) DO UPDATE SET last_seen = EXCLUDED.last_seen
            "#,
            table = edge_table(direction),
            target = target_column(direction),
        );

        sqlx::query(&sql)
            .bind(owner_id)
            .bind(targets)
            .bind(seen_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete edges not stamped by the current pass. Returns the count.
    pub async fn prune_edges(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        seen_before: DateTime<Utc>,
    ) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE owner_id = $1 AND last_seen < $2",
            edge_table(direction),
        );

        let result = sqlx::query(&sql)
            .bind(owner_id)
            .bind(seen_before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn mark_synced(
        &self,
        direction: EdgeDirection,
        owner_id: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE identities SET {} = $2 WHERE id = $1",
            synced_column(direction),
        );

        sqlx::query(&sql)
            .bind(owner_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn edge_ids(&self, direction: EdgeDirection, owner_id: i64) -> Result<HashSet<i64>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE owner_id = $1",
            target_column(direction),
            edge_table(direction),
        );

        let rows = sqlx::query_as::<_, (i64,)>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn insert_follower_edge(
        &self,
        owner_id: i64,
        follower_id: i64,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO follower_edges (owner_id, follower_id, last_seen)
            VALUES ($1, $2, $3)
            ON CONFLICT (owner_id, follower_id) DO UPDATE SET last_seen = EXCLUDED.last_seen
            "#,
        )
        .bind(owner_id)
        .bind(follower_id)
        .bind(seen_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_follower_edge(&self, owner_id: i64, follower_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM follower_edges WHERE owner_id = $1 AND follower_id = $2
            "#,
        )
        .bind(owner_id)
        .bind(follower_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn follower_edge_exists(&self, owner_id: i64, follower_id: i64) -> Result<bool> {
        let row = sqlx::query_as::<_, (i32,)>(
            r#"
            SELECT 1 FROM follower_edges WHERE owner_id = $1 AND follower_id = $2
            "#,
        )
        .bind(owner_id)
        .bind(follower_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    // --- Follow ledger ---

    pub async fn follows(&self, account_id: i64) -> Result<Vec<FollowRecord>> {
        let rows = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r#"
            SELECT leader_id, time FROM follows WHERE account_id = $1 ORDER BY time
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(leader_id, time)| FollowRecord { leader_id, time })
            .collect())
    }

    pub async fn follow(&self, account_id: i64, leader_id: i64) -> Result<Option<FollowRecord>> {
        let row = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r#"
            SELECT leader_id, time FROM follows WHERE account_id = $1 AND leader_id = $2
            "#,
        )
        .bind(account_id)
        .bind(leader_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(leader_id, time)| FollowRecord { leader_id, time }))
    }

    pub async fn last_follow_time(&self, account_id: i64) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query_as::<_, (Option<DateTime<Utc>>,)>(
            r#"
            SELECT MAX(time) FROM follows WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    pub async fn follows_since(&self, account_id: i64, since: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT COUNT(*) FROM follows WHERE account_id = $1 AND time > $2
            "#,
        )
        .bind(account_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    pub async fn add_follow(
        &self,
        account_id: i64,
        leader_id: i64,
        time: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO follows (account_id, leader_id, time) VALUES ($1, $2, $3)
            "#,
        )
        .bind(account_id)
        .bind(leader_id)
        .bind(time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn unfollow(
        &self,
        account_id: i64,
        leader_id: i64,
    ) -> Result<Option<UnfollowRecord>> {
        let row = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r#"
            SELECT leader_id, time FROM unfollows WHERE account_id = $1 AND leader_id = $2
            "#,
        )
        .bind(account_id)
        .bind(leader_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(leader_id, time)| UnfollowRecord { leader_id, time }))
    }

    pub async fn unfollowed_leader_ids(&self, account_id: i64) -> Result<HashSet<i64>> {
        let rows = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT leader_id FROM unfollows WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn add_unfollow(
        &self,
        account_id: i64,
        leader_id: i64,
        time: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO unfollows (account_id, leader_id, time) VALUES ($1, $2, $3)
            "#,
        )
        .bind(account_id)
        .bind(leader_id)
        .bind(time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
