//! Data model shared by the crawler, the aggregation engine, and the query surface.
//!
//! [`RepositoryRecord`] is what gets persisted per crawled repository, [`CrawlState`] is the
//! persisted crawl queue, and [`LeaderboardSnapshot`] is the immutable ranked view that the
//! aggregation engine publishes for readers.

pub mod breakdown;
mod crawl_state;
mod recent_crawls;
mod repo_id;
mod repository_record;
mod snapshot;
mod user_aggregate;

pub use breakdown::{BreakdownSection, SectionLabel, UserBreakdown};
pub use crawl_state::{CRAWL_STATE_KEY, CrawlState};
pub use recent_crawls::{RecentCrawl, RecentCrawls};
pub use repo_id::RepoId;
pub use repository_record::{ContributorEntry, IndexEntry, MIN_RANKABLE_WEIGHT, RepoMeta, RepositoryRecord};
pub use snapshot::{LeaderboardSnapshot, RankWindow, RankedEntry, SnapshotCounters};
pub use user_aggregate::{RepoPoints, UserAggregate};
