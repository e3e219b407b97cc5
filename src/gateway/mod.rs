//! Remote access to repository metadata, contributor lists, and the global repository index.
//!
//! The crawler only depends on the [`Gateway`] trait. [`GitHubGateway`] implements it on top of
//! the GitHub REST API, with every call throttled and bounded by a request timeout. Once GitHub
//! reports that the rate limit is exhausted, the gateway refuses further calls until the limit
//! resets instead of spending requests that would be rejected anyway.

mod client;
mod github;
mod throttler;

pub use client::RateLimitInfo;
pub use github::GitHubGateway;
pub use throttler::Throttler;

use crate::model::{ContributorEntry, IndexEntry, RepoId, RepoMeta};
use chrono::{DateTime, Utc};

/// Outcome of one gateway operation.
#[derive(Debug)]
pub enum FetchResult<T> {
    /// The request succeeded.
    Found(T),

    /// The requested resource does not exist.
    NotFound,

    /// The remote API refused the request because the quota is exhausted.
    RateLimited(RateLimitInfo),

    /// Nothing was sent because requests are paused until the contained time.
    Paused(DateTime<Utc>),

    /// Network failure, timeout, unexpected status, or an undecodable body.
    Failed(ohno::AppError),
}

impl<T> FetchResult<T> {
    /// Transform the success payload, keeping every other outcome.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchResult<U> {
        match self {
            Self::Found(data) => FetchResult::Found(f(data)),
            Self::NotFound => FetchResult::NotFound,
            Self::RateLimited(info) => FetchResult::RateLimited(info),
            Self::Paused(until) => FetchResult::Paused(until),
            Self::Failed(e) => FetchResult::Failed(e),
        }
    }
}

/// Source of repository data consumed by the crawler.
pub trait Gateway: Send + Sync + 'static {
    /// Fetch the metadata of one repository.
    fn get_repository(&self, id: &RepoId) -> impl Future<Output = FetchResult<RepoMeta>> + Send;

    /// Fetch every contributor of one repository.
    fn get_contributors(&self, id: &RepoId) -> impl Future<Output = FetchResult<Vec<ContributorEntry>>> + Send;

    /// Fetch the page of the global repository index that follows the index id `since`.
    ///
    /// An empty page means the end of the index has been reached.
    fn list_repositories(&self, since: Option<u64>) -> impl Future<Output = FetchResult<Vec<IndexEntry>>> + Send;

    /// When requests are paused because the quota ran out, the time they resume.
    fn paused_until(&self) -> Option<DateTime<Utc>>;
}
