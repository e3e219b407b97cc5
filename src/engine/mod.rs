//! Leaderboard aggregation.
//!
//! [`Aggregator`] performs a full fold over the store and atomically publishes the resulting
//! [`LeaderboardSnapshot`](crate::model::LeaderboardSnapshot). [`Debouncer`] decides when that fold
//! runs: a burst of ingests triggers one recompute, and requests that arrive while a recompute is
//! in progress are collapsed into a single follow-up run.

mod aggregator;
mod debouncer;

pub use aggregator::{AggregationSettings, Aggregator};
pub use debouncer::{Debouncer, Job};
