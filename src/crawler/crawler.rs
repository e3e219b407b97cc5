use super::{CrawlError, CrawlRejection};
use crate::Result;
use crate::engine::{Aggregator, Debouncer};
use crate::gateway::Gateway;
use crate::model::{CRAWL_STATE_KEY, CrawlState, RecentCrawl, RecentCrawls, RepoId, RepositoryRecord};
use crate::store::Store;
use chrono::{DateTime, Utc};
use core::time::Duration;
use std::sync::{Arc, Mutex as SyncMutex};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

const LOG_TARGET: &str = "   crawler";

/// Crawl pacing and cooldown parameters.
#[derive(Debug, Clone, Copy)]
pub struct CrawlSettings {
    /// Minimum time between two crawls of the same repository.
    pub recrawl_cooldown: chrono::Duration,

    /// Capacity of the recently crawled buffer.
    pub max_recently_crawled: usize,
}

/// What a single [`Crawler::tick`] accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// A repository was fetched. `stored` is false when it was not worth ranking.
    Crawled { id: RepoId, stored: bool },

    /// A page of the repository index was queued.
    Indexed { queued: usize },

    /// The end of the repository index was reached; the next page starts over.
    Wrapped,
}

/// How an accepted crawl request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlAck {
    /// Placed at the front of the queue.
    Queued,

    /// Already waiting in the queue.
    AlreadyQueued,
}

/// The crawl state plus the repository a tick is currently fetching.
#[derive(Debug)]
struct Progress {
    crawl: CrawlState,
    in_flight: Option<RepoId>,
}

/// Drives the crawl queue: one fetch-and-ingest or one index page per tick.
#[derive(Debug)]
pub struct Crawler<S, G> {
    store: Arc<S>,
    gateway: G,
    recompute: Debouncer<Aggregator<S>>,
    settings: CrawlSettings,
    state: Mutex<Progress>,
    recent: SyncMutex<RecentCrawls>,
}

impl<S: Store, G: Gateway> Crawler<S, G> {
    /// Create a crawler, resuming from the crawl state persisted in `store`.
    pub async fn load(store: Arc<S>, gateway: G, recompute: Debouncer<Aggregator<S>>, settings: CrawlSettings) -> Result<Self> {
        let state = store.get_crawl_state(CRAWL_STATE_KEY).await?.unwrap_or_default();
        log::info!(
            target: LOG_TARGET,
            "Resuming with {} queued repositories, index cursor {:?}",
            state.len(),
            state.cursor
        );

        Ok(Self {
            store,
            gateway,
            recompute,
            settings,
            state: Mutex::new(Progress {
                crawl: state,
                in_flight: None,
            }),
            recent: SyncMutex::new(RecentCrawls::new(settings.max_recently_crawled)),
        })
    }

    /// Run ticks on a fixed period until `shutdown` completes.
    ///
    /// A tick in progress is always finished before returning.
    pub async fn run(&self, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    log::info!(target: LOG_TARGET, "Crawler stopped");
                    return;
                }
                _ = ticker.tick() => self.tick_and_log().await,
            }
        }
    }

    async fn tick_and_log(&self) {
        // failures are logged where they happen
        let Ok(tick) = self.tick().await else {
            return;
        };

        match tick {
            Tick::Crawled { id, stored: true } => log::info!(target: LOG_TARGET, "Crawled '{id}'"),
            Tick::Crawled { id, stored: false } => log::info!(target: LOG_TARGET, "Crawled '{id}', too small to rank"),
            Tick::Indexed { queued } => log::info!(target: LOG_TARGET, "Queued {queued} repositories from the index"),
            Tick::Wrapped => log::info!(target: LOG_TARGET, "Reached the end of the repository index, starting over"),
        }
    }

    /// Perform one unit of crawl work.
    ///
    /// Pops the next queued repository and ingests it, or fetches the next index page when the
    /// queue is empty. The crawl state is persisted afterwards. A repository whose crawl failed is
    /// not queued again, except when the gateway was paused and never sent the requests.
    pub async fn tick(&self) -> Result<Tick, CrawlError> {
        let next = {
            let mut progress = self.state.lock().await;
            let next = progress.crawl.pop_next();
            progress.in_flight.clone_from(&next);
            next
        };
        let Some(id) = next else {
            return self.advance_index().await;
        };

        let outcome = self.ingest(&id).await;

        let mut progress = self.state.lock().await;
        progress.in_flight = None;
        if matches!(outcome, Err(CrawlError::Paused(_))) {
            let _ = progress.crawl.enqueue_front(id.clone());
        }

        let persisted = self.store.upsert_crawl_state(CRAWL_STATE_KEY, &progress.crawl).await;
        drop(progress);

        let stored = outcome.inspect_err(|e| log::warn!(target: LOG_TARGET, "Could not crawl '{id}': {e}"))?;
        persisted
            .map_err(CrawlError::Store)
            .inspect_err(|e| log::warn!(target: LOG_TARGET, "Could not save crawl state: {e}"))?;

        Ok(Tick::Crawled { id, stored })
    }

    async fn advance_index(&self) -> Result<Tick, CrawlError> {
        let cursor = self.state.lock().await.crawl.cursor;

        let page = match CrawlError::check(self.gateway.list_repositories(cursor).await) {
            Ok(page) => page,
            Err(CrawlError::NotFound) => Vec::new(),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not fetch the repository index after {cursor:?}: {e}");
                return Err(e);
            }
        };

        let mut progress = self.state.lock().await;
        let state = &mut progress.crawl;
        let tick = if page.is_empty() {
            state.reset_cursor();
            Tick::Wrapped
        } else {
            Tick::Indexed {
                queued: state.append_page(page),
            }
        };

        self.store
            .upsert_crawl_state(CRAWL_STATE_KEY, state)
            .await
            .map_err(CrawlError::Store)
            .inspect_err(|e| log::warn!(target: LOG_TARGET, "Could not save crawl state: {e}"))?;

        Ok(tick)
    }

    /// Fetch a repository and its contributors, storing the record when it is worth ranking.
    ///
    /// Returns whether the record was stored. Nothing is stored unless both fetches succeed.
    pub async fn ingest(&self, id: &RepoId) -> Result<bool, CrawlError> {
        let (meta, contributors) = tokio::join!(self.gateway.get_repository(id), self.gateway.get_contributors(id));
        let meta = CrawlError::check(meta)?;
        let contributors = CrawlError::check(contributors)?;

        let record = RepositoryRecord::new(id.clone(), meta, contributors, Utc::now());
        let stored = record.is_rankable();
        if stored {
            self.store.upsert_repository(&record).await.map_err(CrawlError::Store)?;
            self.recompute.schedule();
        } else {
            log::debug!(
                target: LOG_TARGET,
                "Not storing '{id}': weight {}, {} contributions",
                record.weight,
                record.total_contributions
            );
        }

        self.recent
            .lock()
            .expect("lock not poisoned")
            .push(RecentCrawl::from_record(&record, stored));

        Ok(stored)
    }

    /// Queue a user-requested crawl ahead of the index backlog.
    ///
    /// The request is refused when the identifier is malformed or the repository was crawled
    /// within the cooldown period. A repository that is being fetched right now counts as queued.
    /// The crawl state is persisted before the request is accepted.
    pub async fn crawl_request(&self, raw: &str, now: DateTime<Utc>) -> Result<CrawlAck, CrawlRejection> {
        let id = RepoId::parse(raw).map_err(|_invalid| CrawlRejection::Invalid(raw.trim().to_string()))?;

        // held throughout so a tick cannot finish this repository between the checks and the enqueue
        let mut progress = self.state.lock().await;
        if progress.in_flight.as_ref() == Some(&id) {
            return Ok(CrawlAck::AlreadyQueued);
        }

        if let Some(last) = self.last_crawled(&id).await? {
            // a crawl stamped in the future counts as just finished
            let elapsed = (now - last).max(chrono::TimeDelta::zero());
            if elapsed < self.settings.recrawl_cooldown {
                let remaining = self.settings.recrawl_cooldown - elapsed;
                return Err(CrawlRejection::Cooldown {
                    minutes_ago: (elapsed.num_seconds() + 30) / 60,
                    minutes_remaining: (remaining.num_seconds() + 59) / 60,
                });
            }
        }

        let mut next = progress.crawl.clone();
        if !next.enqueue_front(id.clone()) {
            return Ok(CrawlAck::AlreadyQueued);
        }

        self.store
            .upsert_crawl_state(CRAWL_STATE_KEY, &next)
            .await
            .map_err(CrawlRejection::Store)?;
        progress.crawl = next;

        log::info!(target: LOG_TARGET, "Queued requested crawl of '{id}'");
        Ok(CrawlAck::Queued)
    }

    /// The most recent crawl time known for `id`, from the buffer or the store.
    async fn last_crawled(&self, id: &RepoId) -> Result<Option<DateTime<Utc>>, CrawlRejection> {
        let recent = self.recent.lock().expect("lock not poisoned").last_crawled(id);
        let stored = self
            .store
            .get_repository(id)
            .await
            .map_err(CrawlRejection::Store)?
            .map(|record| record.crawled_at);

        Ok(recent.max(stored))
    }

    /// The recently crawled repositories, most recent first.
    #[must_use]
    pub fn recent_crawls(&self) -> Vec<RecentCrawl> {
        self.recent.lock().expect("lock not poisoned").to_vec()
    }

    /// A copy of the current crawl state.
    pub async fn crawl_state(&self) -> CrawlState {
        self.state.lock().await.crawl.clone()
    }

    /// When crawling is paused because the remote quota ran out, the time it resumes.
    #[must_use]
    pub fn paused_until(&self) -> Option<DateTime<Utc>> {
        self.gateway.paused_until()
    }
}
