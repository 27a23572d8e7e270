//! The two platform-side lists the engine maintains per account: keepers,
//! whose members are immune to unfollowing, and outsiders, a mirror of the
//! leaders the engine never placed. Both are created on first use.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{info, warn};

use roost_client::RoostUser;

use crate::traits::{FlockStore, Platform};

pub const KEEPERS_SLUG: &str = "flock-keepers";
pub const OUTSIDERS_SLUG: &str = "flock-outsiders";

// The platform derives each slug above from these names.
const KEEPERS_NAME: &str = "flock keepers";
const OUTSIDERS_NAME: &str = "flock outsiders";
const KEEPERS_DESCRIPTION: &str = "flock will not unfollow users in this list";
const OUTSIDERS_DESCRIPTION: &str = "users you manually followed / flock didn't automatically follow";

pub struct ListMirror<'a> {
    platform: &'a dyn Platform,
    store: &'a dyn FlockStore,
    token: &'a str,
    owner: &'a str,
    page_size: i64,
    batch_size: usize,
}

impl<'a> ListMirror<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        store: &'a dyn FlockStore,
        token: &'a str,
        owner: &'a str,
        page_size: i64,
        batch_size: usize,
    ) -> Self {
        Self {
            platform,
            store,
            token,
            owner,
            page_size,
            batch_size,
        }
    }

    /// Read a list's members, creating the list if it does not exist yet.
    /// The create is attempted at most once; a second not-found is real.
    async fn members_or_create(
        &self,
        slug: &str,
        name: &str,
        description: &str,
    ) -> Result<Vec<RoostUser>> {
        let mut created = false;
        loop {
            match self
                .platform
                .list_members(self.token, self.owner, slug, self.page_size)
                .await
            {
                Ok(members) => return Ok(members),
                Err(err) if err.is_not_found() && !created => {
                    warn!(slug, "List not found, creating it");
                    self.platform.create_list(self.token, name, description).await?;
                    created = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Local identity ids of the keepers list members.
    pub async fn keeper_ids(&self) -> Result<HashSet<i64>> {
        let members = self
            .members_or_create(KEEPERS_SLUG, KEEPERS_NAME, KEEPERS_DESCRIPTION)
            .await?;
        let api_ids: Vec<i64> = members.iter().map(|m| m.id).collect();
        let ids = self.store.upsert_api_ids(&api_ids).await?;
        Ok(ids.into_iter().collect())
    }

    /// Push the derived outsider set to its platform list, adding and
    /// removing members in bounded batches.
    pub async fn sync_outsiders(&self, outsider_ids: &HashSet<i64>) -> Result<()> {
        let members = self
            .members_or_create(OUTSIDERS_SLUG, OUTSIDERS_NAME, OUTSIDERS_DESCRIPTION)
            .await?;
        let listed: HashSet<i64> = members.iter().map(|m| m.id).collect();

        let local_ids: Vec<i64> = outsider_ids.iter().copied().collect();
        let wanted: HashSet<i64> = self
            .store
            .identities_by_ids(&local_ids)
            .await?
            .iter()
            .map(|identity| identity.api_id)
            .collect();

        let added: Vec<i64> = wanted.difference(&listed).copied().collect();
        info!(count = added.len(), "Adding outsiders to list");
        for chunk in added.chunks(self.batch_size) {
            self.platform
                .add_list_members(self.token, self.owner, OUTSIDERS_SLUG, chunk)
                .await?;
        }

        let removed: Vec<i64> = listed.difference(&wanted).copied().collect();
        info!(count = removed.len(), "Removing outsiders from list");
        for chunk in removed.chunks(self.batch_size) {
            self.platform
                .remove_list_members(self.token, self.owner, OUTSIDERS_SLUG, chunk)
                .await?;
        }

        Ok(())
    }
}
