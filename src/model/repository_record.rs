use super::RepoId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repositories at or below this weight never contribute to any score.
pub const MIN_RANKABLE_WEIGHT: u64 = 1;

/// One contributor of a repository, as reported by the hosting API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorEntry {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
    #[serde(default)]
    pub gravatar_id: Option<String>,
    pub html_url: String,
    pub contributions: u64,
}

/// Repository metadata returned by the hosting API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMeta {
    pub id: u64,
    pub full_name: RepoId,
    pub html_url: String,
    pub weight: u64,
}

/// One entry of the global repository index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: u64,
    pub full_name: RepoId,
}

/// Everything known about one crawled repository.
///
/// Each successful crawl replaces the previous record for the same identifier wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: RepoId,
    pub weight: u64,
    pub total_contributions: u64,
    pub contributors: Vec<ContributorEntry>,
    pub crawled_at: DateTime<Utc>,
    pub url: String,
}

impl RepositoryRecord {
    /// Build a record from freshly fetched data, summing the contribution counts.
    ///
    /// The record is keyed by the identifier that was requested, not the canonical name the
    /// API reports, so that later requests for the same identifier find it.
    #[must_use]
    pub fn new(id: RepoId, meta: RepoMeta, contributors: Vec<ContributorEntry>, crawled_at: DateTime<Utc>) -> Self {
        let total_contributions = contributors.iter().map(|c| c.contributions).sum();
        Self {
            id,
            weight: meta.weight,
            total_contributions,
            contributors,
            crawled_at,
            url: meta.html_url,
        }
    }

    /// Whether this repository is allowed to contribute to user scores.
    #[must_use]
    pub const fn is_rankable(&self) -> bool {
        self.total_contributions > 0 && self.weight > MIN_RANKABLE_WEIGHT
    }

    /// Whether the stored total matches the contributor list.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.contributors.iter().map(|c| c.contributions).sum::<u64>() == self.total_contributions
    }
}
