use std::env;

use chrono::Duration;

/// Deployment configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct FlockConfig {
    pub database_url: String,
    /// Override for the platform API origin. Defaults to the public API.
    pub roost_base_url: Option<String>,
}

impl FlockConfig {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            roost_base_url: env::var("ROOST_BASE_URL").ok(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

/// Tuning knobs for one account's tending loop. All rate and grace
/// decisions read from here; nothing consults ambient state.
#[derive(Debug, Clone)]
pub struct TenderConfig {
    /// Hard ceiling on follows performed in any trailing 24 hours.
    pub max_follows_per_day: i64,
    /// Leader budget multiplier over the current follower count.
    pub max_leader_ratio: f64,
    /// Flat headroom over the follower count, for small accounts where
    /// the ratio alone would starve the budget.
    pub extra_leader_allowance: i64,
    /// Minimum spacing between two follow actions by the same account.
    pub follow_cooldown: Duration,
    /// Refresh period for the account's own follower mirror. Also the
    /// base for the jittered sleep between cycles.
    pub self_followers_period: Duration,
    /// Refresh period for leader and mentor-follower mirrors.
    pub graph_sync_period: Duration,
    /// Grace before unfollowing a leader who has not followed back.
    pub short_grace: Duration,
    /// Grace before unfollowing any leader, reciprocated or not.
    pub long_grace: Duration,
    /// Page size requested when reading list members.
    pub list_page_size: i64,
    /// Largest membership change pushed in one list call.
    pub list_batch_size: usize,
}

impl Default for TenderConfig {
    fn default() -> Self {
        Self {
            max_follows_per_day: 400,
            max_leader_ratio: 1.5,
            extra_leader_allowance: 500,
            follow_cooldown: Duration::seconds(5),
            self_followers_period: Duration::hours(6),
            graph_sync_period: Duration::days(3),
            short_grace: Duration::days(2),
            long_grace: Duration::days(28),
            list_page_size: 5000,
            list_batch_size: 100,
        }
    }
}
