use crate::gateway::{FetchResult, RateLimitInfo};
use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};

/// Why an ingestion or index fetch was abandoned.
#[derive(Debug)]
pub enum CrawlError {
    /// The repository, or the requested index page, does not exist.
    NotFound,

    /// The remote quota is exhausted until the contained reset time.
    RateLimited(RateLimitInfo),

    /// Nothing was fetched because requests are paused until the contained time.
    Paused(DateTime<Utc>),

    /// Network or HTTP failure while talking to the remote API.
    Remote(ohno::AppError),

    /// The store could not persist or read state.
    Store(ohno::AppError),
}

impl CrawlError {
    /// Unwrap a successful fetch, classifying every other outcome.
    pub fn check<T>(result: FetchResult<T>) -> Result<T, Self> {
        match result {
            FetchResult::Found(data) => Ok(data),
            FetchResult::NotFound => Err(Self::NotFound),
            FetchResult::RateLimited(info) => Err(Self::RateLimited(info)),
            FetchResult::Paused(until) => Err(Self::Paused(until)),
            FetchResult::Failed(e) => Err(Self::Remote(e)),
        }
    }
}

impl Display for CrawlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::RateLimited(info) => write!(f, "rate limited until {}", info.reset_at),
            Self::Paused(until) => write!(f, "requests paused until {until}"),
            Self::Remote(e) => write!(f, "remote fetch failed: {e:#}"),
            Self::Store(e) => write!(f, "store failure: {e:#}"),
        }
    }
}

impl core::error::Error for CrawlError {}

/// Why a crawl request was refused.
#[derive(Debug)]
pub enum CrawlRejection {
    /// The identifier is empty or not shaped like `owner/name`.
    Invalid(String),

    /// The repository was crawled too recently.
    Cooldown { minutes_ago: i64, minutes_remaining: i64 },

    /// The request could not be persisted.
    Store(ohno::AppError),
}

impl Display for CrawlRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Invalid(input) => write!(f, "invalid repoId: '{input}' (expected owner/name)"),
            Self::Cooldown {
                minutes_ago,
                minutes_remaining,
            } => write!(
                f,
                "that repo was last crawled {minutes_ago} minutes ago; try again in ~{minutes_remaining} minutes"
            ),
            Self::Store(_) => write!(f, "the crawl request could not be saved; please try again later"),
        }
    }
}

impl core::error::Error for CrawlRejection {}
