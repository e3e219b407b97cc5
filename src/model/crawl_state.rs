use super::{IndexEntry, RepoId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Store key under which the crawl state singleton lives.
pub const CRAWL_STATE_KEY: &str = "crawl";

/// The pending crawl queue and the position reached in the global repository index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    /// Id of the last index entry queued, `None` when starting from the beginning.
    #[serde(default)]
    pub cursor: Option<u64>,

    #[serde(default)]
    pub queue: VecDeque<RepoId>,
}

impl CrawlState {
    pub fn pop_next(&mut self) -> Option<RepoId> {
        self.queue.pop_front()
    }

    /// Queue every entry of an index page and move the cursor past it.
    ///
    /// Returns the number of entries queued. An empty page leaves the state untouched.
    pub fn append_page(&mut self, page: impl IntoIterator<Item = IndexEntry>) -> usize {
        let mut count = 0;
        for entry in page {
            self.cursor = Some(entry.id);
            self.queue.push_back(entry.full_name);
            count += 1;
        }
        count
    }

    /// Start over from the beginning of the index.
    pub const fn reset_cursor(&mut self) {
        self.cursor = None;
    }

    /// Put a requested repository at the front of the queue.
    ///
    /// Returns `false` when the repository was already waiting in the queue.
    pub fn enqueue_front(&mut self, id: RepoId) -> bool {
        if self.queue.contains(&id) {
            return false;
        }
        self.queue.push_front(id);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
