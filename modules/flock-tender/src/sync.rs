//! Graph mirror synchronization: cursor-paginated walks of a user's
//! platform-side leader or follower list, reconciled into the local edge
//! mirror by watermark pruning.

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use flock_common::EdgeDirection;
use roost_client::IdPage;

use crate::traits::{FlockStore, Platform};

pub struct GraphSync<'a> {
    platform: &'a dyn Platform,
    store: &'a dyn FlockStore,
    token: &'a str,
}

impl<'a> GraphSync<'a> {
    pub fn new(platform: &'a dyn Platform, store: &'a dyn FlockStore, token: &'a str) -> Self {
        Self {
            platform,
            store,
            token,
        }
    }

    /// Walk one side of `owner`'s graph and rebuild its edge mirror.
    ///
    /// Returns `Ok(false)` without touching anything when the mirror was
    /// refreshed within `period`. Otherwise every page's edges are stamped
    /// with the pass start; after the final page, edges the walk did not
    /// stamp are pruned and the owner's sync time is advanced. An error
    /// mid-walk leaves the old mirror and sync time intact, so the next
    /// attempt restarts the pass from the first page.
    pub async fn sync_edges(
        &self,
        owner_id: i64,
        direction: EdgeDirection,
        period: Duration,
    ) -> Result<bool> {
        let owner = self.store.identity(owner_id).await?;
        debug!(
            owner = %owner.label(),
            %direction,
            synced_at = ?owner.synced_at(direction),
            "Maybe syncing edge mirror"
        );
        if let Some(synced_at) = owner.synced_at(direction) {
            if synced_at > Utc::now() - period {
                debug!(owner = %owner.label(), %direction, "Mirror is fresh, skipping");
                return Ok(false);
            }
        }

        let pass_start = Utc::now();
        let mut cursor = IdPage::FIRST;
        let mut pages = 0u32;
        let mut edges = 0usize;
        loop {
            let page = match direction {
                EdgeDirection::Leaders => {
                    self.platform
                        .leader_ids_page(self.token, owner.api_id, cursor)
                        .await?
                }
                EdgeDirection::Followers => {
                    self.platform
                        .follower_ids_page(self.token, owner.api_id, cursor)
                        .await?
                }
            };
            let target_ids = self.store.upsert_api_ids(&page.ids).await?;
            self.store
                .touch_edges(direction, owner_id, &target_ids, pass_start)
                .await?;
            pages += 1;
            edges += target_ids.len();
            if page.is_last() {
                break;
            }
            cursor = page.next_cursor;
        }

        // Everything not stamped by this pass is no longer true.
        let pruned = self.store.prune_edges(direction, owner_id, pass_start).await?;
        self.store.mark_synced(direction, owner_id, pass_start).await?;
        info!(
            owner = %owner.label(),
            %direction,
            pages,
            edges,
            pruned,
            "Synced edge mirror"
        );
        Ok(true)
    }
}
