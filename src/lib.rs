//! contrib-rank crate
//!
//! Crawls repositories from the GitHub REST API, scores every contributor by the share of each
//! repository they own weighted by the repository's popularity, and serves a ranked leaderboard.
//!
//! # Module Organization
//!
//! - [`model`]: repository records, crawl state, and the published leaderboard snapshot
//! - [`store`]: persistence contract with on-disk and in-memory implementations
//! - [`gateway`]: rate-limited GitHub client used to fetch repositories and contributors
//! - [`engine`]: full-fold aggregation and coalesced recompute scheduling
//! - [`crawler`]: the crawl queue, ingestion, and crawl requests
//! - [`server`]: read-only query surface, HTML views, and HTTP routes
//! - [`config`]: configuration file model and validation
//! - [`misc`]: number formatting and logging setup

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod config;
pub mod crawler;
pub mod engine;
pub mod gateway;
pub mod misc;
pub mod model;
pub mod server;
pub mod store;
