use super::Job;
use crate::model::{LeaderboardSnapshot, RepoPoints, RepositoryRecord, SnapshotCounters, UserAggregate};
use crate::store::Store;
use chrono::Utc;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

const LOG_TARGET: &str = "    engine";

/// Scoring parameters applied when building a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AggregationSettings {
    /// Users must score strictly more than this to be ranked.
    pub min_point_threshold: f64,

    /// Number of users on the home page.
    pub leaderboard_size: usize,
}

/// Folds every stored repository into user scores and publishes the resulting leaderboard.
#[derive(Debug)]
pub struct Aggregator<S> {
    store: Arc<S>,
    settings: AggregationSettings,
    publisher: watch::Sender<Arc<LeaderboardSnapshot>>,
}

impl<S: Store> Aggregator<S> {
    #[must_use]
    pub fn new(store: Arc<S>, settings: AggregationSettings) -> Self {
        let (publisher, _) = watch::channel(Arc::new(LeaderboardSnapshot::empty()));
        Self {
            store,
            settings,
            publisher,
        }
    }

    /// A receiver that always observes the latest published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<LeaderboardSnapshot>> {
        self.publisher.subscribe()
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<LeaderboardSnapshot> {
        Arc::clone(&self.publisher.borrow())
    }

    /// Rebuild the leaderboard from the store and publish it.
    pub async fn recompute(&self) -> Arc<LeaderboardSnapshot> {
        let start = Instant::now();
        let snapshot = Arc::new(self.fold().await);

        log::info!(
            target: LOG_TARGET,
            "Ranked {} users from {} repositories in {:.3}s",
            snapshot.ranked().len(),
            snapshot.counters().repositories,
            start.elapsed().as_secs_f64()
        );

        let _ = self.publisher.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    /// Build a snapshot from a full pass over the store without publishing it.
    pub async fn fold(&self) -> LeaderboardSnapshot {
        let mut users: HashMap<String, (UserAggregate, Vec<RepoPoints>)> = HashMap::new();
        let mut counters = SnapshotCounters::default();

        let mut records = self.store.stream_repositories();
        while let Some(item) = records.next().await {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Skipping unreadable repository record: {e:#}");
                    continue;
                }
            };

            if !record.is_rankable() {
                log::debug!(target: LOG_TARGET, "Skipping '{}': nothing to rank", record.id);
                continue;
            }

            if !record.is_consistent() {
                log::warn!(
                    target: LOG_TARGET,
                    "Skipping malformed record '{}': stored total {} does not match its contributors",
                    record.id,
                    record.total_contributions
                );
                continue;
            }

            counters.repositories += 1;
            counters.contributions += record.total_contributions;
            fold_record(&mut users, &record);
        }

        counters.users = users.len() as u64;

        LeaderboardSnapshot::build(
            users.into_values(),
            counters,
            self.settings.min_point_threshold,
            self.settings.leaderboard_size,
            Utc::now(),
        )
    }
}

impl<S: Store> Job for Aggregator<S> {
    async fn run(&self) {
        let _ = self.recompute().await;
    }
}

/// Credit every contributor of `record` with their share of the repository's weight.
#[expect(clippy::cast_precision_loss, reason = "contribution counts and weights stay far below 2^53")]
fn fold_record(users: &mut HashMap<String, (UserAggregate, Vec<RepoPoints>)>, record: &RepositoryRecord) {
    let weight = record.weight as f64;
    let total = record.total_contributions as f64;

    for entry in &record.contributors {
        let points = weight * entry.contributions as f64 / total;

        let (user, repos) = users
            .entry(entry.login.clone())
            .or_insert_with(|| (UserAggregate::new(entry), Vec::new()));

        user.refresh_display(entry);
        user.score += points;
        user.contributions += entry.contributions;
        repos.push(RepoPoints {
            repo: record.id.clone(),
            points,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContributorEntry, RepoId};
    use crate::store::{DocStore, MemoryStore};

    const SETTINGS: AggregationSettings = AggregationSettings {
        min_point_threshold: 10.0,
        leaderboard_size: 100,
    };

    fn contributor(login: &str, contributions: u64) -> ContributorEntry {
        ContributorEntry {
            login: login.to_string(),
            id: 0,
            avatar_url: format!("https://avatars.example/{login}"),
            gravatar_id: None,
            html_url: format!("https://github.com/{login}"),
            contributions,
        }
    }

    fn record(name: &str, weight: u64, contributors: &[(&str, u64)]) -> RepositoryRecord {
        let contributors: Vec<_> = contributors.iter().map(|(login, n)| contributor(login, *n)).collect();
        RepositoryRecord {
            id: RepoId::parse(name).unwrap(),
            weight,
            total_contributions: contributors.iter().map(|c| c.contributions).sum(),
            contributors,
            crawled_at: Utc::now(),
            url: format!("https://github.com/{name}"),
        }
    }

    async fn store_with(records: &[RepositoryRecord]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for r in records {
            store.upsert_repository(r).await.unwrap();
        }
        store
    }

    fn scores(snapshot: &LeaderboardSnapshot) -> Vec<(String, f64)> {
        snapshot.ranked().iter().map(|u| (u.login.clone(), u.score)).collect()
    }

    #[tokio::test]
    async fn test_two_repository_example() {
        let store = store_with(&[
            record("org/a", 100, &[("alice", 80), ("bob", 20)]),
            record("org/b", 50, &[("alice", 10), ("carol", 40)]),
        ])
        .await;
        let aggregator = Aggregator::new(store, SETTINGS);

        let snapshot = aggregator.recompute().await;

        assert_eq!(
            scores(&snapshot),
            [("alice".to_string(), 90.0), ("carol".to_string(), 40.0), ("bob".to_string(), 20.0)]
        );
        assert_eq!(
            snapshot.counters(),
            SnapshotCounters {
                repositories: 2,
                users: 3,
                contributions: 150,
            }
        );
        assert_eq!(snapshot.ranked()[0].contributions, 90);
    }

    #[tokio::test]
    async fn test_ownership_partitions_weight() {
        let store = store_with(&[record("org/odd", 97, &[("a", 3), ("b", 7), ("c", 11), ("d", 13)])]).await;
        let aggregator = Aggregator::new(
            store,
            AggregationSettings {
                min_point_threshold: 0.0,
                leaderboard_size: 100,
            },
        );

        let snapshot = aggregator.fold().await;
        let total: f64 = snapshot.ranked().iter().map(|u| u.score).sum();

        assert_eq!(snapshot.ranked().len(), 4);
        assert!((total - 97.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let store = store_with(&[
            record("x/one", 40, &[("ann", 1), ("ben", 1), ("cat", 2)]),
            record("x/two", 300, &[("ben", 5), ("dan", 5)]),
            record("x/three", 77, &[("ann", 9), ("dan", 2)]),
        ])
        .await;
        let aggregator = Aggregator::new(store, SETTINGS);

        let first = aggregator.recompute().await;
        let second = aggregator.recompute().await;

        assert_eq!(first.ranked(), second.ranked());
        assert_eq!(first.counters(), second.counters());
    }

    #[tokio::test]
    async fn test_unrankable_and_malformed_records_are_skipped() {
        let mut malformed = record("bad/total", 500, &[("mallory", 10)]);
        malformed.total_contributions = 11;

        let store = store_with(&[
            record("ok/repo", 100, &[("alice", 1)]),
            record("tiny/repo", 1, &[("bob", 50)]),
            record("empty/repo", 1000, &[]),
            malformed,
        ])
        .await;
        let aggregator = Aggregator::new(store, SETTINGS);

        let snapshot = aggregator.fold().await;

        assert_eq!(scores(&snapshot), [("alice".to_string(), 100.0)]);
        assert_eq!(snapshot.counters().repositories, 1);
        assert_eq!(snapshot.counters().users, 1);
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let store = store_with(&[record("r/r", 20, &[("even", 1), ("half", 1)])]).await;
        let aggregator = Aggregator::new(store, SETTINGS);

        let snapshot = aggregator.fold().await;

        assert!(snapshot.ranked().is_empty());
        assert_eq!(snapshot.counters().users, 2);
    }

    #[tokio::test]
    async fn test_unreadable_document_does_not_abort_fold() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocStore::open(tmp.path()).unwrap();
        store.upsert_repository(&record("good/repo", 50, &[("alice", 2)])).await.unwrap();
        std::fs::create_dir_all(tmp.path().join("repos").join("zz")).unwrap();
        std::fs::write(tmp.path().join("repos").join("zz").join("broken.json"), "{").unwrap();

        let aggregator = Aggregator::new(Arc::new(store), SETTINGS);
        let snapshot = aggregator.fold().await;

        assert_eq!(scores(&snapshot), [("alice".to_string(), 50.0)]);
    }

    #[tokio::test]
    async fn test_recompute_publishes_to_subscribers() {
        let store = store_with(&[record("p/q", 100, &[("alice", 1)])]).await;
        let aggregator = Aggregator::new(store, SETTINGS);
        let receiver = aggregator.subscribe();
        assert!(receiver.borrow().ranked().is_empty());

        let _ = aggregator.recompute().await;

        assert_eq!(receiver.borrow().ranked().len(), 1);
        assert_eq!(aggregator.current().ranked()[0].login, "alice");
    }

    #[tokio::test]
    async fn test_breakdown_lists_contributing_repositories() {
        let store = store_with(&[
            record("org/a", 100, &[("alice", 80), ("bob", 20)]),
            record("org/b", 50, &[("alice", 10), ("carol", 40)]),
        ])
        .await;
        let aggregator = Aggregator::new(store, SETTINGS);

        let snapshot = aggregator.recompute().await;
        let breakdown = snapshot.breakdown("alice").unwrap();

        assert_eq!(breakdown.rank, 1);
        assert_eq!(breakdown.sections.len(), 2);
        assert_eq!(breakdown.sections[0].label.to_string(), "org/a");
    }
}
