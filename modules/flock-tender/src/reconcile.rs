//! Candidate derivation: pure set algebra over mirrored edges, the action
//! ledgers, and the keeper list. No remote calls, no store access — the
//! tender snapshots the graph, calls [`reconcile`], and hands the derived
//! sets to the actuator.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use flock_common::{FollowRecord, TenderConfig};

/// Everything reconciliation reads, snapshotted once per cycle.
#[derive(Debug, Default)]
pub struct GraphView {
    /// Mirrored leaders of the account's own identity.
    pub leader_ids: HashSet<i64>,
    /// Mirrored followers of the account's own identity.
    pub follower_ids: HashSet<i64>,
    /// Leaders with an unfollow record.
    pub unfollowed_ids: HashSet<i64>,
    /// The full follow ledger, oldest first.
    pub follows: Vec<FollowRecord>,
    /// Members of the keepers list; immune to unfollowing.
    pub keeper_ids: HashSet<i64>,
}

/// Sets derived by [`reconcile`]. Intermediate sets are kept so the caller
/// can log the funnel one step at a time.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Every leader the engine ever followed.
    pub followed_ids: HashSet<i64>,
    /// Followed and not since unfollowed: follows the engine believes stand.
    pub insider_ids: HashSet<i64>,
    /// Current leaders the engine never placed.
    pub outsider_ids: HashSet<i64>,
    /// Insiders absent from the live graph — drift from manual unfollows or
    /// platform-side removals. Diagnostic only; never acted on.
    pub desaparecidos: HashSet<i64>,
    /// Follows older than the long grace, reciprocated or not.
    pub overdue_ids: HashSet<i64>,
    /// Follows older than the short grace with no follow-back.
    pub unreciprocated_ids: HashSet<i64>,
    /// The unfollow set after the leader, ledger, and keeper filters.
    pub unfollow_ids: HashSet<i64>,
}

/// Derive the cycle's working sets from a graph snapshot.
pub fn reconcile(view: &GraphView, now: DateTime<Utc>, config: &TenderConfig) -> Reconciliation {
    let followed_ids: HashSet<i64> = view.follows.iter().map(|f| f.leader_id).collect();
    let insider_ids: HashSet<i64> = followed_ids
        .difference(&view.unfollowed_ids)
        .copied()
        .collect();
    let outsider_ids: HashSet<i64> = view.leader_ids.difference(&insider_ids).copied().collect();
    let desaparecidos: HashSet<i64> = insider_ids.difference(&view.leader_ids).copied().collect();

    let overdue_before = now - config.long_grace;
    let overdue_ids: HashSet<i64> = view
        .follows
        .iter()
        .filter(|f| f.time < overdue_before)
        .map(|f| f.leader_id)
        .collect();

    let unreciprocated_before = now - config.short_grace;
    let unreciprocated_ids: HashSet<i64> = view
        .follows
        .iter()
        .filter(|f| f.time < unreciprocated_before)
        .map(|f| f.leader_id)
        .filter(|id| !view.follower_ids.contains(id))
        .collect();

    let mut unfollow_ids: HashSet<i64> =
        overdue_ids.union(&unreciprocated_ids).copied().collect();
    // Never unfollow someone we aren't actually following.
    unfollow_ids.retain(|id| view.leader_ids.contains(id));
    unfollow_ids.retain(|id| !view.unfollowed_ids.contains(id));
    unfollow_ids.retain(|id| !view.keeper_ids.contains(id));

    Reconciliation {
        followed_ids,
        insider_ids,
        outsider_ids,
        desaparecidos,
        overdue_ids,
        unreciprocated_ids,
        unfollow_ids,
    }
}

/// Mentor followers worth following: not yet in the ledger and not already
/// leaders. Unfollowed pairs stay excluded through `followed_ids`, so the
/// engine never re-follows.
pub fn follow_pool(
    mentor_follower_ids: &HashSet<i64>,
    followed_ids: &HashSet<i64>,
    leader_ids: &HashSet<i64>,
) -> HashSet<i64> {
    mentor_follower_ids
        .iter()
        .filter(|id| !followed_ids.contains(id))
        .filter(|id| !leader_ids.contains(id))
        .copied()
        .collect()
}

/// Most leaders the account may hold, scaled from its follower count.
pub fn leader_ceiling(follower_count: usize, config: &TenderConfig) -> i64 {
    let by_ratio = (follower_count as f64 * config.max_leader_ratio) as i64;
    by_ratio.max(follower_count as i64 + config.extra_leader_allowance)
}

/// Follows the account may still perform this cycle. Negative when the
/// account holds more leaders than its ceiling allows.
pub fn remaining_follows(
    ceiling: i64,
    leader_count: usize,
    follows_today: i64,
    config: &TenderConfig,
) -> i64 {
    (ceiling - leader_count as i64).min(config.max_follows_per_day - follows_today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ids(values: &[i64]) -> HashSet<i64> {
        values.iter().copied().collect()
    }

    fn view(
        leaders: &[i64],
        followers: &[i64],
        unfollowed: &[i64],
        follows: Vec<FollowRecord>,
        keepers: &[i64],
    ) -> GraphView {
        GraphView {
            leader_ids: ids(leaders),
            follower_ids: ids(followers),
            unfollowed_ids: ids(unfollowed),
            follows,
            keeper_ids: ids(keepers),
        }
    }

    fn followed_at(leader_id: i64, age: Duration, now: DateTime<Utc>) -> FollowRecord {
        FollowRecord {
            leader_id,
            time: now - age,
        }
    }

    #[test]
    fn outsiders_are_leaders_minus_insiders() {
        let now = Utc::now();
        let follows = vec![
            followed_at(1, Duration::days(1), now),
            followed_at(2, Duration::days(1), now),
        ];
        let view = view(&[1, 2, 3], &[], &[2], follows, &[]);
        let derived = reconcile(&view, now, &TenderConfig::default());

        assert_eq!(derived.insider_ids, ids(&[1]));
        // 2 was unfollowed by the engine yet still stands, 3 was never placed.
        assert_eq!(derived.outsider_ids, ids(&[2, 3]));
    }

    #[test]
    fn desaparecidos_are_insiders_missing_from_live_graph() {
        let now = Utc::now();
        let follows = vec![
            followed_at(1, Duration::days(40), now),
            followed_at(2, Duration::days(40), now),
        ];
        let view = view(&[1], &[], &[], follows, &[]);
        let derived = reconcile(&view, now, &TenderConfig::default());

        assert_eq!(derived.desaparecidos, ids(&[2]));
        // Diagnostic only: a vanished insider is never an unfollow candidate.
        assert!(!derived.unfollow_ids.contains(&2));
        assert_eq!(derived.unfollow_ids, ids(&[1]));
    }

    #[test]
    fn short_grace_spares_reciprocated_follows() {
        let now = Utc::now();
        // Both followed 10 days ago; only 7 followed back.
        let follows = vec![
            followed_at(7, Duration::days(10), now),
            followed_at(8, Duration::days(10), now),
        ];
        let view = view(&[7, 8], &[7], &[], follows, &[]);
        let derived = reconcile(&view, now, &TenderConfig::default());

        assert_eq!(derived.unreciprocated_ids, ids(&[8]));
        assert_eq!(derived.unfollow_ids, ids(&[8]));
    }

    #[test]
    fn long_grace_expires_even_reciprocated_follows() {
        let now = Utc::now();
        let follows = vec![followed_at(7, Duration::days(30), now)];
        let view = view(&[7], &[7], &[], follows, &[]);
        let derived = reconcile(&view, now, &TenderConfig::default());

        assert_eq!(derived.overdue_ids, ids(&[7]));
        assert_eq!(derived.unfollow_ids, ids(&[7]));
    }

    #[test]
    fn fresh_follows_are_untouchable() {
        let now = Utc::now();
        let follows = vec![followed_at(7, Duration::hours(12), now)];
        let view = view(&[7], &[], &[], follows, &[]);
        let derived = reconcile(&view, now, &TenderConfig::default());

        assert!(derived.unfollow_ids.is_empty());
    }

    #[test]
    fn keepers_are_never_candidates() {
        let now = Utc::now();
        let follows = vec![
            followed_at(1, Duration::days(400), now),
            followed_at(2, Duration::days(400), now),
        ];
        let view = view(&[1, 2], &[], &[], follows, &[1]);
        let derived = reconcile(&view, now, &TenderConfig::default());

        assert!(!derived.unfollow_ids.contains(&1));
        assert_eq!(derived.unfollow_ids, ids(&[2]));
    }

    #[test]
    fn candidates_restricted_to_current_leaders_and_fresh_ledger() {
        let now = Utc::now();
        let follows = vec![
            followed_at(1, Duration::days(30), now), // no longer a leader
            followed_at(2, Duration::days(30), now), // already unfollowed
            followed_at(3, Duration::days(30), now),
        ];
        let view = view(&[2, 3], &[], &[2], follows, &[]);
        let derived = reconcile(&view, now, &TenderConfig::default());

        assert_eq!(derived.unfollow_ids, ids(&[3]));
    }

    #[test]
    fn follow_pool_excludes_history_and_current_leaders() {
        let pool = follow_pool(&ids(&[1, 2, 3, 4]), &ids(&[2]), &ids(&[3]));
        assert_eq!(pool, ids(&[1, 4]));
    }

    #[test]
    fn ceiling_takes_ratio_or_flat_allowance() {
        let config = TenderConfig::default();
        // Small account: the flat allowance dominates.
        assert_eq!(leader_ceiling(10, &config), 510);
        // Large account: the ratio dominates.
        assert_eq!(leader_ceiling(2000, &config), 3000);
        // The ratio product truncates, it does not round.
        assert_eq!(leader_ceiling(1003, &config), 1504);
    }

    #[test]
    fn remaining_follows_hits_the_tighter_bound() {
        let config = TenderConfig::default();
        // Leader headroom tighter than the daily cap.
        assert_eq!(remaining_follows(600, 550, 0, &config), 50);
        // Daily cap tighter than headroom.
        assert_eq!(remaining_follows(5000, 100, 390, &config), 10);
        // Over the ceiling already: negative, caller must not follow.
        assert_eq!(remaining_follows(500, 700, 0, &config), -200);
    }
}
