//! The crawl scheduler.
//!
//! A [`Crawler`] owns the persisted crawl queue. Each tick either ingests the next queued
//! repository or, when the queue is empty, fetches the next page of the global repository index.
//! Users can push repositories to the front of the queue with [`Crawler::crawl_request`], subject
//! to a per-repository cooldown.

#[expect(clippy::module_inception, reason = "the crawler type lives in its own file like the rest of the crate")]
mod crawler;
mod error;

pub use crawler::{CrawlAck, CrawlSettings, Crawler, Tick};
pub use error::{CrawlError, CrawlRejection};
