use crate::crawler::{CrawlAck, CrawlRejection, Crawler};
use crate::gateway::Gateway;
use crate::model::{LeaderboardSnapshot, RankWindow, RankedEntry, RecentCrawl, SnapshotCounters, UserBreakdown};
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Everything the home page shows.
#[derive(Debug, Clone)]
pub struct HomeView {
    pub top: Vec<RankedEntry>,
    pub counters: SnapshotCounters,
    pub recent: Vec<RecentCrawl>,
    pub built_at: DateTime<Utc>,

    /// Set while crawling waits for the GitHub quota to reset.
    pub paused_until: Option<DateTime<Utc>>,
}

/// Read-only access to the leaderboard plus the crawl request entry point.
///
/// Every read works on whichever snapshot is current when the call starts; a concurrent
/// recompute never changes the data a single call sees.
#[derive(Debug)]
pub struct QueryService<S, G> {
    snapshots: watch::Receiver<Arc<LeaderboardSnapshot>>,
    crawler: Arc<Crawler<S, G>>,
    rank_window_radius: usize,
}

impl<S: Store, G: Gateway> QueryService<S, G> {
    #[must_use]
    pub const fn new(
        snapshots: watch::Receiver<Arc<LeaderboardSnapshot>>,
        crawler: Arc<Crawler<S, G>>,
        rank_window_radius: usize,
    ) -> Self {
        Self {
            snapshots,
            crawler,
            rank_window_radius,
        }
    }

    fn snapshot(&self) -> Arc<LeaderboardSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// The top of the leaderboard, summary counters, recent crawls, and any crawl pause.
    #[must_use]
    pub fn home(&self) -> HomeView {
        let snapshot = self.snapshot();
        let top = snapshot
            .top()
            .iter()
            .enumerate()
            .map(|(i, user)| RankedEntry {
                rank: i + 1,
                user: user.clone(),
            })
            .collect();

        HomeView {
            top,
            counters: snapshot.counters(),
            recent: self.crawler.recent_crawls(),
            built_at: snapshot.built_at(),
            paused_until: self.crawler.paused_until(),
        }
    }

    /// The ranks around `login`, or `None` when the user is not ranked.
    #[must_use]
    pub fn find_rank(&self, login: &str) -> Option<RankWindow> {
        self.snapshot().find_rank(login, self.rank_window_radius)
    }

    /// Where a ranked user's points come from.
    #[must_use]
    pub fn user_breakdown(&self, login: &str) -> Option<UserBreakdown> {
        self.snapshot().breakdown(login)
    }

    /// Queue a crawl of `raw` (an `owner/name` identifier) without waiting for it.
    pub async fn crawl_request(&self, raw: &str) -> Result<CrawlAck, CrawlRejection> {
        self.crawler.crawl_request(raw, Utc::now()).await
    }
}
