use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Identities ---

/// A platform-side user as mirrored locally. A row is created the first
/// time any sync pass observes the user's platform id; the `*_synced_at`
/// stamps record when each side of the user's graph was last fully walked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub api_id: i64,
    pub screen_name: Option<String>,
    pub leaders_synced_at: Option<DateTime<Utc>>,
    pub followers_synced_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn synced_at(&self, direction: EdgeDirection) -> Option<DateTime<Utc>> {
        match direction {
            EdgeDirection::Leaders => self.leaders_synced_at,
            EdgeDirection::Followers => self.followers_synced_at,
        }
    }

    /// Screen name if known, platform id otherwise. For log lines only.
    pub fn label(&self) -> String {
        match &self.screen_name {
            Some(name) => name.clone(),
            None => self.api_id.to_string(),
        }
    }
}

/// An account the tender operates on behalf of. Rows are provisioned out
/// of band; the engine only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub screen_name: String,
    pub identity_id: i64,
    pub access_token: String,
}

// --- Follow ledger ---

/// One follow performed by the engine. Records are append-only: they are
/// never deleted or updated, even after the pair is unfollowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowRecord {
    pub leader_id: i64,
    pub time: DateTime<Utc>,
}

/// One unfollow performed by the engine. Written only for pairs that
/// already have a follow record; a pair with both records is terminal and
/// is never re-followed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnfollowRecord {
    pub leader_id: i64,
    pub time: DateTime<Utc>,
}

// --- Edges ---

/// Which side of the follow graph an operation addresses: `Leaders` are
/// the users an owner follows, `Followers` are the users following them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    Leaders,
    Followers,
}

impl std::fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeDirection::Leaders => write!(f, "leaders"),
            EdgeDirection::Followers => write!(f, "followers"),
        }
    }
}
