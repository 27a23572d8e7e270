/// Counters from one tend cycle, printed when the cycle ends.
#[derive(Debug, Default)]
pub struct CycleStats {
    pub keepers: usize,
    pub mentors_synced: u32,
    pub mentors_missing: u32,
    pub leaders: usize,
    pub followers: usize,
    pub outsiders: usize,
    pub desaparecidos: usize,
    pub unfollow_candidates: usize,
    pub unfollowed: u32,
    pub unfollows_skipped: u32,
    pub follow_pool: usize,
    pub follow_budget: i64,
    pub followed: u32,
    pub follows_skipped: u32,
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Tend Cycle Complete ===")?;
        writeln!(f, "Keepers:        {}", self.keepers)?;
        writeln!(
            f,
            "Mentors synced: {} ({} missing)",
            self.mentors_synced, self.mentors_missing
        )?;
        writeln!(f, "Leaders:        {}", self.leaders)?;
        writeln!(f, "Followers:      {}", self.followers)?;
        writeln!(f, "Outsiders:      {}", self.outsiders)?;
        writeln!(f, "Desaparecidos:  {}", self.desaparecidos)?;
        writeln!(
            f,
            "Unfollowed:     {} of {} candidates ({} skipped)",
            self.unfollowed, self.unfollow_candidates, self.unfollows_skipped
        )?;
        writeln!(
            f,
            "Followed:       {} of {} pooled, budget {} ({} skipped)",
            self.followed, self.follow_pool, self.follow_budget, self.follows_skipped
        )?;
        Ok(())
    }
}
