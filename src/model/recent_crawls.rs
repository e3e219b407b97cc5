use super::{RepoId, RepositoryRecord};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Summary of one crawl, kept for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentCrawl {
    pub id: RepoId,
    pub url: String,
    pub weight: u64,
    pub contributor_count: usize,
    pub total_contributions: u64,
    pub crawled_at: DateTime<Utc>,
    /// Whether the record was persisted (and so counts toward scores).
    pub stored: bool,
}

impl RecentCrawl {
    #[must_use]
    pub fn from_record(record: &RepositoryRecord, stored: bool) -> Self {
        Self {
            id: record.id.clone(),
            url: record.url.clone(),
            weight: record.weight,
            contributor_count: record.contributors.len(),
            total_contributions: record.total_contributions,
            crawled_at: record.crawled_at,
            stored,
        }
    }
}

/// Bounded, most-recent-first list of crawled repositories.
#[derive(Debug, Clone)]
pub struct RecentCrawls {
    entries: VecDeque<RecentCrawl>,
    capacity: usize,
}

impl RecentCrawls {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, crawl: RecentCrawl) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_front(crawl);
        self.entries.truncate(self.capacity);
    }

    /// When the given repository was last crawled, if it is still in the buffer.
    #[must_use]
    pub fn last_crawled(&self, id: &RepoId) -> Option<DateTime<Utc>> {
        self.entries.iter().find(|c| &c.id == id).map(|c| c.crawled_at)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecentCrawl> {
        self.entries.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<RecentCrawl> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
