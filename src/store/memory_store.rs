use super::Store;
use crate::Result;
use crate::model::{CrawlState, RepoId, RepositoryRecord};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A non-persistent store holding everything in ordered maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    repos: Mutex<BTreeMap<RepoId, RepositoryRecord>>,
    meta: Mutex<BTreeMap<String, CrawlState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored repository records.
    #[must_use]
    pub fn repository_count(&self) -> usize {
        self.repos.lock().expect("lock not poisoned").len()
    }
}

impl Store for MemoryStore {
    async fn upsert_repository(&self, record: &RepositoryRecord) -> Result<()> {
        let _ = self
            .repos
            .lock()
            .expect("lock not poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_repository(&self, id: &RepoId) -> Result<Option<RepositoryRecord>> {
        Ok(self.repos.lock().expect("lock not poisoned").get(id).cloned())
    }

    fn stream_repositories(&self) -> BoxStream<'_, Result<RepositoryRecord>> {
        let records: Vec<RepositoryRecord> = self.repos.lock().expect("lock not poisoned").values().cloned().collect();
        stream::iter(records.into_iter().map(Ok)).boxed()
    }

    async fn get_crawl_state(&self, key: &str) -> Result<Option<CrawlState>> {
        Ok(self.meta.lock().expect("lock not poisoned").get(key).cloned())
    }

    async fn upsert_crawl_state(&self, key: &str, state: &CrawlState) -> Result<()> {
        let _ = self
            .meta
            .lock()
            .expect("lock not poisoned")
            .insert(key.to_string(), state.clone());
        Ok(())
    }
}
