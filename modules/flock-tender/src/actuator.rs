//! Follow and unfollow execution, with the guardrails: per-action cooldown,
//! trailing-24h cap, grace periods, and append-only ledger bookkeeping. The
//! reconciliation filters run again here, so a stale candidate set can only
//! cause skips, never a premature action.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use flock_common::{Account, TenderConfig};

use crate::stats::CycleStats;
use crate::traits::{FlockStore, Platform};

/// What became of one follow attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// The platform accepted; ledger and follower mirror updated.
    Followed,
    /// The platform refused (already following, or blocked). Recorded in
    /// the ledger so the pair is never retried; no follow-back is assumed.
    Recorded,
    AlreadyFollowed,
    Cooldown,
    DailyCapReached,
}

/// What became of one unfollow attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    /// The platform no longer knows the target. Nothing is recorded; the
    /// next leader sync drops the pair from the mirror.
    Vanished,
    NeverFollowed,
    AlreadyUnfollowed,
    TooRecent,
}

pub struct Actuator<'a> {
    platform: &'a dyn Platform,
    store: &'a dyn FlockStore,
    account: &'a Account,
    config: &'a TenderConfig,
}

impl<'a> Actuator<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        store: &'a dyn FlockStore,
        account: &'a Account,
        config: &'a TenderConfig,
    ) -> Self {
        Self {
            platform,
            store,
            account,
            config,
        }
    }

    /// Follow one leader, unless the ledger or the rate guards say no.
    pub async fn follow(&self, leader_id: i64) -> Result<FollowOutcome> {
        let leader = self.store.identity(leader_id).await?;
        let now = Utc::now();
        let last_follow = self.store.last_follow_time(self.account.id).await?;
        let follows_today = self
            .store
            .follows_since(self.account.id, now - Duration::days(1))
            .await?;
        debug!(
            leader = %leader.label(),
            ?last_follow,
            follows_today,
            "Considering follow"
        );

        if let Some(prior) = self.store.follow(self.account.id, leader_id).await? {
            warn!(leader = %leader.label(), followed_at = %prior.time, "Not following: already followed");
            return Ok(FollowOutcome::AlreadyFollowed);
        }
        if let Some(last) = last_follow {
            if last > now - self.config.follow_cooldown {
                warn!(leader = %leader.label(), "Not following: followed someone too recently");
                return Ok(FollowOutcome::Cooldown);
            }
        }
        if follows_today >= self.config.max_follows_per_day {
            warn!(leader = %leader.label(), follows_today, "Not following: too many follows today");
            return Ok(FollowOutcome::DailyCapReached);
        }

        match self
            .platform
            .create_follow(&self.account.access_token, leader.api_id)
            .await
        {
            Ok(user) => {
                self.store.note_screen_name(user.id, &user.screen_name).await?;
                self.store.add_follow(self.account.id, leader_id, Utc::now()).await?;
                // The platform reflects the new edge immediately; mirror it
                // into the leader's follower set rather than wait for a sync.
                self.store
                    .insert_follower_edge(leader_id, self.account.identity_id, Utc::now())
                    .await?;
                info!(leader = %user.screen_name, "Followed");
                Ok(FollowOutcome::Followed)
            }
            Err(err) if err.is_forbidden() => {
                // Refused can mean blocked or already following. Either way
                // the pair is spent: record it, assume nothing else.
                warn!(leader = %leader.label(), error = %err, "Follow refused, marking as followed");
                self.store.add_follow(self.account.id, leader_id, Utc::now()).await?;
                Ok(FollowOutcome::Recorded)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Unfollow one leader, re-checking the ledger and grace periods.
    pub async fn unfollow(&self, leader_id: i64) -> Result<UnfollowOutcome> {
        let leader = self.store.identity(leader_id).await?;
        let follow = self.store.follow(self.account.id, leader_id).await?;
        debug!(
            leader = %leader.label(),
            followed_at = ?follow.as_ref().map(|f| f.time),
            "Considering unfollow"
        );

        let Some(follow) = follow else {
            warn!(leader = %leader.label(), "Not unfollowing: never followed");
            return Ok(UnfollowOutcome::NeverFollowed);
        };
        if let Some(prior) = self.store.unfollow(self.account.id, leader_id).await? {
            warn!(leader = %leader.label(), unfollowed_at = %prior.time, "Not unfollowing: already unfollowed");
            return Ok(UnfollowOutcome::AlreadyUnfollowed);
        }
        let now = Utc::now();
        if follow.time > now - self.config.short_grace {
            warn!(leader = %leader.label(), "Not unfollowing: followed too recently");
            return Ok(UnfollowOutcome::TooRecent);
        }
        let follows_back = self
            .store
            .follower_edge_exists(self.account.identity_id, leader_id)
            .await?;
        if follows_back && follow.time > now - self.config.long_grace {
            warn!(
                leader = %leader.label(),
                "Not unfollowing: followed too recently for someone who followed back"
            );
            return Ok(UnfollowOutcome::TooRecent);
        }

        match self
            .platform
            .destroy_follow(&self.account.access_token, leader.api_id)
            .await
        {
            Ok(user) => {
                self.store.note_screen_name(user.id, &user.screen_name).await?;
                self.store.add_unfollow(self.account.id, leader_id, Utc::now()).await?;
                self.store
                    .delete_follower_edge(leader_id, self.account.identity_id)
                    .await?;
                info!(leader = %user.screen_name, "Unfollowed");
                Ok(UnfollowOutcome::Unfollowed)
            }
            Err(err) if err.is_not_found() => {
                warn!(leader = %leader.label(), error = %err, "Failed to unfollow, target gone");
                Ok(UnfollowOutcome::Vanished)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Unfollow every candidate, unpaced; each target re-checks its own
    /// guards, so a stale set degrades to skips.
    pub async fn unfollow_batch(
        &self,
        candidates: &std::collections::HashSet<i64>,
        stats: &mut CycleStats,
    ) -> Result<()> {
        for &leader_id in candidates {
            match self.unfollow(leader_id).await? {
                UnfollowOutcome::Unfollowed => stats.unfollowed += 1,
                _ => stats.unfollows_skipped += 1,
            }
        }
        Ok(())
    }

    /// Follow up to `budget` pool members, drawn uniformly at random, with
    /// a jittered pause between successive attempts. A non-positive budget
    /// means the account is over its ceiling; nothing happens.
    pub async fn follow_batch(
        &self,
        pool: &std::collections::HashSet<i64>,
        budget: i64,
        stats: &mut CycleStats,
    ) -> Result<()> {
        if budget <= 0 {
            return Ok(());
        }
        let mut candidates: Vec<i64> = pool.iter().copied().collect();
        candidates.shuffle(&mut rand::rng());
        candidates.truncate(budget as usize);

        for (i, &leader_id) in candidates.iter().enumerate() {
            if i > 0 {
                let pause = jittered(self.config.follow_cooldown, 1.0, 2.0);
                debug!(?pause, "Pacing before the next follow");
                tokio::time::sleep(pause).await;
            }
            match self.follow(leader_id).await? {
                FollowOutcome::Followed | FollowOutcome::Recorded => stats.followed += 1,
                _ => stats.follows_skipped += 1,
            }
        }
        Ok(())
    }
}

/// A duration drawn uniformly from `[low, high]` multiples of `base`.
pub(crate) fn jittered(base: Duration, low: f64, high: f64) -> std::time::Duration {
    let factor = rand::rng().random_range(low..=high);
    let millis = (base.num_milliseconds() as f64 * factor).max(0.0);
    std::time::Duration::from_millis(millis as u64)
}
