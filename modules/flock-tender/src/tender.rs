//! The per-account tending loop: refresh mirrors, derive candidate sets,
//! act on them, sleep, repeat. One `Tender` runs per managed account and
//! shares nothing with its siblings but the store and the platform client.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use flock_common::{Account, EdgeDirection, TenderConfig};
use roost_client::RoostError;

use crate::actuator::{jittered, Actuator};
use crate::lists::ListMirror;
use crate::reconcile::{self, GraphView};
use crate::stats::CycleStats;
use crate::sync::GraphSync;
use crate::traits::{FlockStore, Platform};

pub struct Tender {
    platform: Arc<dyn Platform>,
    store: Arc<dyn FlockStore>,
    account: Account,
    config: TenderConfig,
}

impl Tender {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn FlockStore>,
        account: Account,
        config: TenderConfig,
    ) -> Self {
        Self {
            platform,
            store,
            account,
            config,
        }
    }

    /// Cycle until an error stops this account. Sleeps a jittered fraction
    /// of the follower sync period between cycles so accounts provisioned
    /// together drift apart instead of hammering the platform in step.
    pub async fn run_forever(&self) -> Result<()> {
        loop {
            match self.run_cycle().await {
                Ok(stats) => info!("{stats}"),
                Err(err) => {
                    match err.downcast_ref::<RoostError>() {
                        Some(api_err) => {
                            error!(error = %api_err, "Platform error, stopping this account")
                        }
                        None => error!(error = %err, "Cycle failed, stopping this account"),
                    }
                    return Err(err);
                }
            }
            let nap = jittered(self.config.self_followers_period, 0.1, 0.9);
            info!(minutes = nap.as_secs() / 60, "Sleeping until the next cycle");
            tokio::time::sleep(nap).await;
        }
    }

    /// One full pass. Every sync step gates itself on its own period, so
    /// running cycles back to back is safe: fresh mirrors are skipped and
    /// the actuator's guards block repeat actions.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let mut stats = CycleStats::default();
        let token = &self.account.access_token;
        let sync = GraphSync::new(self.platform.as_ref(), self.store.as_ref(), token);
        let lists = ListMirror::new(
            self.platform.as_ref(),
            self.store.as_ref(),
            token,
            &self.account.screen_name,
            self.config.list_page_size,
            self.config.list_batch_size,
        );
        let actuator = Actuator::new(
            self.platform.as_ref(),
            self.store.as_ref(),
            &self.account,
            &self.config,
        );

        let keeper_ids = lists.keeper_ids().await?;
        info!(keepers = keeper_ids.len(), "Fetched keepers");
        stats.keepers = keeper_ids.len();

        // Mentor followers feed the candidate pool. A mentor who left the
        // platform is logged and skipped; anything else ends the cycle.
        let mentors = self.store.mentors(self.account.id).await?;
        for mentor in &mentors {
            match sync
                .sync_edges(mentor.id, EdgeDirection::Followers, self.config.graph_sync_period)
                .await
            {
                Ok(synced) => {
                    if synced {
                        stats.mentors_synced += 1;
                    }
                }
                Err(err) => match err.downcast_ref::<RoostError>() {
                    Some(api_err) if api_err.is_not_found() => {
                        warn!(mentor = %mentor.label(), "Mentor no longer exists");
                        stats.mentors_missing += 1;
                    }
                    _ => return Err(err),
                },
            }
        }

        let leaders_synced = sync
            .sync_edges(
                self.account.identity_id,
                EdgeDirection::Leaders,
                self.config.graph_sync_period,
            )
            .await?;
        sync.sync_edges(
            self.account.identity_id,
            EdgeDirection::Followers,
            self.config.self_followers_period,
        )
        .await?;

        let view = GraphView {
            leader_ids: self
                .store
                .edge_ids(EdgeDirection::Leaders, self.account.identity_id)
                .await?,
            follower_ids: self
                .store
                .edge_ids(EdgeDirection::Followers, self.account.identity_id)
                .await?,
            unfollowed_ids: self.store.unfollowed_leader_ids(self.account.id).await?,
            follows: self.store.follows(self.account.id).await?,
            keeper_ids,
        };
        let now = Utc::now();
        let derived = reconcile::reconcile(&view, now, &self.config);

        let examples: Vec<i64> = derived.desaparecidos.iter().take(3).copied().collect();
        info!(
            count = derived.desaparecidos.len(),
            ?examples,
            "Desaparecidos: ledger follows missing from the live graph"
        );
        info!(
            followers = view.follower_ids.len(),
            leaders = view.leader_ids.len(),
            outsiders = derived.outsider_ids.len(),
            "Graph totals"
        );
        stats.leaders = view.leader_ids.len();
        stats.followers = view.follower_ids.len();
        stats.outsiders = derived.outsider_ids.len();
        stats.desaparecidos = derived.desaparecidos.len();

        // Skip the remote list write when the leader mirror did not move.
        if leaders_synced {
            lists.sync_outsiders(&derived.outsider_ids).await?;
        }

        let followed_back = derived
            .followed_ids
            .intersection(&view.follower_ids)
            .count();
        info!(
            followed = view.follows.len(),
            followed_back,
            unfollowed = view.unfollowed_ids.len(),
            "Ledger totals"
        );
        info!(
            past_long_grace = derived.overdue_ids.len(),
            unreciprocated_past_short_grace = derived.unreciprocated_ids.len(),
            candidates = derived.unfollow_ids.len(),
            "Unfollow candidates"
        );
        stats.unfollow_candidates = derived.unfollow_ids.len();

        actuator.unfollow_batch(&derived.unfollow_ids, &mut stats).await?;

        let mut mentor_follower_ids: HashSet<i64> = HashSet::new();
        for mentor in &mentors {
            mentor_follower_ids
                .extend(self.store.edge_ids(EdgeDirection::Followers, mentor.id).await?);
        }
        // Reload leaders; the snapshot predates the unfollow batch.
        let leader_ids = self
            .store
            .edge_ids(EdgeDirection::Leaders, self.account.identity_id)
            .await?;
        let pool = reconcile::follow_pool(&mentor_follower_ids, &derived.followed_ids, &leader_ids);
        info!(
            mentor_followers = mentor_follower_ids.len(),
            pool = pool.len(),
            "Follow pool"
        );
        stats.follow_pool = pool.len();

        let ceiling = reconcile::leader_ceiling(view.follower_ids.len(), &self.config);
        let follows_today = view
            .follows
            .iter()
            .filter(|f| f.time > Utc::now() - Duration::days(1))
            .count() as i64;
        let budget =
            reconcile::remaining_follows(ceiling, leader_ids.len(), follows_today, &self.config);
        info!(
            leaders = leader_ids.len(),
            ceiling,
            follows_today,
            cap = self.config.max_follows_per_day,
            budget,
            "Follow budget"
        );
        stats.follow_budget = budget;

        actuator.follow_batch(&pool, budget, &mut stats).await?;

        Ok(stats)
    }
}
