//! Persistence for repository records and the crawl state.
//!
//! The [`Store`] trait is the only thing the crawler and the aggregation engine know about
//! persistence. [`DocStore`] keeps one JSON document per repository on disk, while
//! [`MemoryStore`] keeps everything in memory and is mostly useful for tests.

mod doc_store;
mod instance_lock;
mod memory_store;
mod path_utils;

pub use doc_store::DocStore;
pub use instance_lock::{InstanceLockGuard, acquire_instance_lock};
pub use memory_store::MemoryStore;

use crate::Result;
use crate::model::{CrawlState, RepoId, RepositoryRecord};
use futures_util::stream::BoxStream;

/// Durable storage consumed by the crawler and the aggregation engine.
pub trait Store: Send + Sync + 'static {
    /// Insert or fully replace the record stored under `record.id`.
    fn upsert_repository(&self, record: &RepositoryRecord) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the record stored for `id`, if any.
    fn get_repository(&self, id: &RepoId) -> impl Future<Output = Result<Option<RepositoryRecord>>> + Send;

    /// Lazily yield every stored record, one at a time, in a stable order.
    ///
    /// A record that cannot be read shows up as an `Err` item; the stream keeps going.
    fn stream_repositories(&self) -> BoxStream<'_, Result<RepositoryRecord>>;

    fn get_crawl_state(&self, key: &str) -> impl Future<Output = Result<Option<CrawlState>>> + Send;

    fn upsert_crawl_state(&self, key: &str, state: &CrawlState) -> impl Future<Output = Result<()>> + Send;
}
