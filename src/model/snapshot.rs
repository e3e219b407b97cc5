use super::breakdown::{self, UserBreakdown};
use super::{RepoPoints, UserAggregate};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Totals gathered while folding the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotCounters {
    pub repositories: u64,
    pub users: u64,
    pub contributions: u64,
}

/// A user with a 1-based leaderboard rank attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rank: usize,
    pub user: UserAggregate,
}

/// A slice of the leaderboard centered on one user.
#[derive(Debug, Clone, PartialEq)]
pub struct RankWindow {
    /// 1-based rank of the user that was looked up.
    pub rank: usize,
    pub entries: Vec<RankedEntry>,
}

/// An immutable, fully computed leaderboard.
///
/// Snapshots are never modified after [`LeaderboardSnapshot::build`]; a newer one is published
/// in its place.
#[derive(Debug, Clone)]
pub struct LeaderboardSnapshot {
    ranked: Vec<UserAggregate>,
    top_count: usize,
    repo_points: HashMap<String, Vec<RepoPoints>>,
    counters: SnapshotCounters,
    built_at: DateTime<Utc>,
}

impl LeaderboardSnapshot {
    /// The snapshot served before the first recompute completes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ranked: Vec::new(),
            top_count: 0,
            repo_points: HashMap::new(),
            counters: SnapshotCounters::default(),
            built_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Rank every user scoring strictly above `threshold`.
    ///
    /// Users are ordered by descending score; equal scores are ordered by login so that
    /// rebuilding from the same data always yields the same ranking.
    #[must_use]
    pub fn build(
        users: impl IntoIterator<Item = (UserAggregate, Vec<RepoPoints>)>,
        counters: SnapshotCounters,
        threshold: f64,
        top_count: usize,
        built_at: DateTime<Utc>,
    ) -> Self {
        let mut ranked = Vec::new();
        let mut repo_points = HashMap::new();
        for (user, points) in users {
            if user.score > threshold {
                let _ = repo_points.insert(user.login.clone(), points);
                ranked.push(user);
            }
        }

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.login.cmp(&b.login)));

        Self {
            ranked,
            top_count,
            repo_points,
            counters,
            built_at,
        }
    }

    /// The leading entries shown on the home page.
    #[must_use]
    pub fn top(&self) -> &[UserAggregate] {
        &self.ranked[..self.top_count.min(self.ranked.len())]
    }

    /// Every ranked user, best first.
    #[must_use]
    pub fn ranked(&self) -> &[UserAggregate] {
        &self.ranked
    }

    #[must_use]
    pub const fn counters(&self) -> SnapshotCounters {
        self.counters
    }

    #[must_use]
    pub const fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// 0-based position of `login` (exact, case-sensitive match).
    #[must_use]
    pub fn position(&self, login: &str) -> Option<usize> {
        self.ranked.iter().position(|u| u.login == login)
    }

    /// The users ranked within `radius` places of `login`, clamped to the leaderboard.
    #[must_use]
    pub fn find_rank(&self, login: &str, radius: usize) -> Option<RankWindow> {
        let index = self.position(login)?;
        let start = index.saturating_sub(radius);
        let end = index.saturating_add(radius).min(self.ranked.len() - 1);

        let entries = self.ranked[start..=end]
            .iter()
            .enumerate()
            .map(|(offset, user)| RankedEntry {
                rank: start + offset + 1,
                user: user.clone(),
            })
            .collect();

        Some(RankWindow { rank: index + 1, entries })
    }

    /// Where a ranked user's points come from.
    #[must_use]
    pub fn breakdown(&self, login: &str) -> Option<UserBreakdown> {
        let index = self.position(login)?;
        let user = &self.ranked[index];
        let points = self.repo_points.get(login).map_or(&[][..], Vec::as_slice);

        Some(UserBreakdown {
            rank: index + 1,
            user: user.clone(),
            sections: breakdown::sections(user.score, points),
        })
    }
}
