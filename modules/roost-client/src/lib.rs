pub mod error;
pub mod types;

pub use error::{Result, RoostError};
pub use types::{IdPage, MembersResponse, RoostList, RoostUser};

const BASE_URL: &str = "https://api.roost.social/1.1";

/// Thin client for the Roost REST API. One instance serves any number of
/// accounts; the acting account's token is passed per call.
pub struct RoostClient {
    client: reqwest::Client,
    base_url: String,
}

impl RoostClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// One page of the ids a user follows. Pass [`IdPage::FIRST`] to start
    /// a walk and stop when [`IdPage::is_last`].
    pub async fn leader_ids_page(&self, token: &str, user_id: i64, cursor: i64) -> Result<IdPage> {
        self.ids_page(token, "friends/ids", user_id, cursor).await
    }

    /// One page of the ids following a user. Same cursor convention as
    /// [`Self::leader_ids_page`].
    pub async fn follower_ids_page(
        &self,
        token: &str,
        user_id: i64,
        cursor: i64,
    ) -> Result<IdPage> {
        self.ids_page(token, "followers/ids", user_id, cursor).await
    }

    async fn ids_page(
        &self,
        token: &str,
        endpoint: &str,
        user_id: i64,
        cursor: i64,
    ) -> Result<IdPage> {
        let url = format!("{}/{}.json", self.base_url, endpoint);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("user_id", user_id.to_string()),
                ("cursor", cursor.to_string()),
            ])
            .send()
            .await?;

        let resp = Self::checked(resp).await?;
        let page: IdPage = resp.json().await?;
        tracing::debug!(
            endpoint,
            user_id,
            count = page.ids.len(),
            next_cursor = page.next_cursor,
            "Fetched id page"
        );
        Ok(page)
    }

    /// Members of a slug-addressed list. One call; the caller picks a
    /// `count` large enough to cover the whole list.
    pub async fn list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        count: i64,
    ) -> Result<Vec<RoostUser>> {
        let url = format!("{}/lists/members.json", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("owner_screen_name", owner.to_string()),
                ("slug", slug.to_string()),
                ("count", count.to_string()),
                ("skip_status", "true".to_string()),
            ])
            .send()
            .await?;

        let resp = Self::checked(resp).await?;
        let members: MembersResponse = resp.json().await?;
        Ok(members.users)
    }

    /// Create a member list. The platform derives the slug from the name.
    pub async fn create_list(
        &self,
        token: &str,
        name: &str,
        mode: &str,
        description: &str,
    ) -> Result<RoostList> {
        let url = format!("{}/lists/create.json", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .form(&[("name", name), ("mode", mode), ("description", description)])
            .send()
            .await?;

        let resp = Self::checked(resp).await?;
        let list: RoostList = resp.json().await?;
        tracing::debug!(name = %list.name, slug = %list.slug, "Created list");
        Ok(list)
    }

    /// Add a batch of users to a list in one call.
    pub async fn add_list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        user_ids: &[i64],
    ) -> Result<()> {
        self.bulk_list_edit(token, "lists/members/create_all", owner, slug, user_ids)
            .await
    }

    /// Remove a batch of users from a list in one call.
    pub async fn remove_list_members(
        &self,
        token: &str,
        owner: &str,
        slug: &str,
        user_ids: &[i64],
    ) -> Result<()> {
        self.bulk_list_edit(token, "lists/members/destroy_all", owner, slug, user_ids)
            .await
    }

    async fn bulk_list_edit(
        &self,
        token: &str,
        endpoint: &str,
        owner: &str,
        slug: &str,
        user_ids: &[i64],
    ) -> Result<()> {
        let joined = user_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let url = format!("{}/{}.json", self.base_url, endpoint);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .form(&[
                ("owner_screen_name", owner.to_string()),
                ("slug", slug.to_string()),
                ("user_id", joined),
            ])
            .send()
            .await?;

        Self::checked(resp).await?;
        tracing::debug!(endpoint, slug, count = user_ids.len(), "Edited list members");
        Ok(())
    }

    /// Follow a user. A 403 surfaces as [`RoostError::Forbidden`]: the
    /// platform refused (target blocked the caller, or the follow already
    /// exists) without saying which.
    pub async fn create_follow(&self, token: &str, user_id: i64) -> Result<RoostUser> {
        self.friendship(token, "friendships/create", user_id).await
    }

    /// Unfollow a user. A 404 surfaces as [`RoostError::NotFound`]: the
    /// platform no longer recognizes the id.
    pub async fn destroy_follow(&self, token: &str, user_id: i64) -> Result<RoostUser> {
        self.friendship(token, "friendships/destroy", user_id).await
    }

    async fn friendship(&self, token: &str, endpoint: &str, user_id: i64) -> Result<RoostUser> {
        let url = format!("{}/{}.json", self.base_url, endpoint);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .form(&[("user_id", user_id.to_string())])
            .send()
            .await?;

        let resp = Self::checked(resp).await?;
        let user: RoostUser = resp.json().await?;
        tracing::debug!(endpoint, user_id, screen_name = %user.screen_name, "Friendship call ok");
        Ok(user)
    }

    async fn checked(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RoostError::from_status(status.as_u16(), body));
        }
        Ok(resp)
    }
}

impl Default for RoostClient {
    fn default() -> Self {
        Self::new()
    }
}
