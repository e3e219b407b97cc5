//! End-to-end: crawl repositories from a mocked GitHub into an on-disk store and watch the
//! leaderboard update.

use chrono::Utc;
use contrib_rank::crawler::{CrawlAck, CrawlError, CrawlSettings, Crawler, Tick};
use contrib_rank::engine::{AggregationSettings, Aggregator, Debouncer};
use contrib_rank::gateway::GitHubGateway;
use contrib_rank::model::{LeaderboardSnapshot, RepoId};
use contrib_rank::server::QueryService;
use contrib_rank::store::{DocStore, Store};
use core::time::Duration;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SETTINGS: AggregationSettings = AggregationSettings {
    min_point_threshold: 5.0,
    leaderboard_size: 100,
};

async fn mock_repo(server: &MockServer, name: &str, watchers: u64, contributors: &[(&str, u64)]) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "full_name": name,
            "html_url": format!("https://github.com/{name}"),
            "watchers_count": watchers,
        })))
        .mount(server)
        .await;

    let body: Vec<_> = contributors
        .iter()
        .map(|(login, contributions)| {
            json!({
                "login": login,
                "id": 1,
                "avatar_url": "",
                "html_url": format!("https://github.com/{login}"),
                "contributions": contributions,
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/repos/{name}/contributors")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

struct Pipeline {
    store: Arc<DocStore>,
    crawler: Arc<Crawler<DocStore, GitHubGateway>>,
    snapshots: watch::Receiver<Arc<LeaderboardSnapshot>>,
}

async fn pipeline(root: &Path, server: &MockServer) -> Pipeline {
    let store = Arc::new(DocStore::open(root).unwrap());
    let gateway = GitHubGateway::new("token", &server.uri(), Duration::from_secs(5), 10).unwrap();
    let aggregator = Arc::new(Aggregator::new(Arc::clone(&store), SETTINGS));
    let snapshots = aggregator.subscribe();
    let debouncer = Debouncer::new(aggregator, Duration::from_millis(20));
    let settings = CrawlSettings {
        recrawl_cooldown: chrono::Duration::minutes(60),
        max_recently_crawled: 20,
    };
    let crawler = Arc::new(Crawler::load(Arc::clone(&store), gateway, debouncer, settings).await.unwrap());

    Pipeline {
        store,
        crawler,
        snapshots,
    }
}

async fn next_snapshot(snapshots: &mut watch::Receiver<Arc<LeaderboardSnapshot>>) -> Arc<LeaderboardSnapshot> {
    tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("a recompute within five seconds")
        .unwrap();
    Arc::clone(&snapshots.borrow_and_update())
}

#[tokio::test]
async fn test_requested_crawl_reaches_the_leaderboard() {
    let server = MockServer::start().await;
    mock_repo(&server, "octo/widgets", 100, &[("alice", 90), ("bob", 10)]).await;

    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(dir.path(), &server).await;

    let ack = p.crawler.crawl_request("  octo/widgets ", Utc::now()).await.unwrap();
    assert_eq!(ack, CrawlAck::Queued);

    let tick = p.crawler.tick().await.unwrap();
    assert_eq!(
        tick,
        Tick::Crawled {
            id: RepoId::parse("octo/widgets").unwrap(),
            stored: true,
        }
    );

    let stored = p.store.get_repository(&RepoId::parse("octo/widgets").unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.weight, 100);
    assert_eq!(stored.total_contributions, 100);

    let snapshot = next_snapshot(&mut p.snapshots).await;
    let top: Vec<_> = snapshot.top().iter().map(|u| (u.login.as_str(), u.score)).collect();
    assert_eq!(top, vec![("alice", 90.0), ("bob", 10.0)]);
    assert_eq!(snapshot.counters().repositories, 1);
    assert_eq!(snapshot.counters().users, 2);
    assert_eq!(snapshot.counters().contributions, 100);
}

#[tokio::test]
async fn test_recrawl_request_is_rejected_during_cooldown() {
    let server = MockServer::start().await;
    mock_repo(&server, "octo/widgets", 100, &[("alice", 100)]).await;

    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(dir.path(), &server).await;

    let _ = p.crawler.crawl_request("octo/widgets", Utc::now()).await.unwrap();
    let _ = p.crawler.tick().await.unwrap();

    let err = p.crawler.crawl_request("octo/widgets", Utc::now()).await.unwrap_err();
    assert!(err.to_string().contains("try again in ~60 minutes"), "{err}");
}

#[tokio::test]
async fn test_restart_resumes_queue_and_ranks_stored_repositories() {
    let server = MockServer::start().await;
    mock_repo(&server, "octo/widgets", 50, &[("alice", 40), ("carol", 10)]).await;

    let dir = tempfile::tempdir().unwrap();

    {
        let p = pipeline(dir.path(), &server).await;
        // requests jump ahead of each other, so widgets is crawled first
        let _ = p.crawler.crawl_request("octo/gadgets", Utc::now()).await.unwrap();
        let _ = p.crawler.crawl_request("octo/widgets", Utc::now()).await.unwrap();
        let _ = p.crawler.tick().await.unwrap();
    }

    let p = pipeline(dir.path(), &server).await;
    let state = p.crawler.crawl_state().await;
    assert_eq!(state.len(), 1);
    assert_eq!(state.queue.front().map(RepoId::as_str), Some("octo/gadgets"));

    let aggregator = Aggregator::new(Arc::clone(&p.store), SETTINGS);
    let snapshot = aggregator.recompute().await;
    let top: Vec<_> = snapshot.top().iter().map(|u| (u.login.as_str(), u.score)).collect();
    assert_eq!(top, vec![("alice", 40.0), ("carol", 10.0)]);
}

#[tokio::test]
async fn test_query_service_reads_published_snapshot() {
    let server = MockServer::start().await;
    mock_repo(&server, "octo/widgets", 100, &[("alice", 60), ("bob", 40)]).await;

    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(dir.path(), &server).await;
    let service = QueryService::new(p.snapshots.clone(), Arc::clone(&p.crawler), 10);

    let _ = service.crawl_request("octo/widgets").await.unwrap();
    let _ = p.crawler.tick().await.unwrap();
    let _ = next_snapshot(&mut p.snapshots).await;

    let home = service.home();
    assert_eq!(home.top.len(), 2);
    assert_eq!(home.recent.len(), 1);

    let window = service.find_rank("bob").unwrap();
    assert_eq!(window.rank, 2);

    let breakdown = service.user_breakdown("alice").unwrap();
    assert_eq!(breakdown.rank, 1);
    assert!(service.user_breakdown("nobody").is_none());
}

#[tokio::test]
async fn test_blocked_repository_does_not_stall_the_queue() {
    let server = MockServer::start().await;
    mock_repo(&server, "octo/widgets", 100, &[("alice", 100)]).await;
    Mock::given(method("GET"))
        .and(path("/repos/blocked/repo"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "4999")
                .set_body_json(json!({ "message": "Repository access blocked" })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(dir.path(), &server).await;

    let _ = p.crawler.crawl_request("octo/widgets", Utc::now()).await.unwrap();
    let _ = p.crawler.crawl_request("blocked/repo", Utc::now()).await.unwrap();

    let err = p.crawler.tick().await.unwrap_err();
    assert!(matches!(err, CrawlError::Remote(_)), "{err}");
    assert!(p.crawler.paused_until().is_none());

    let tick = p.crawler.tick().await.unwrap();
    assert_eq!(
        tick,
        Tick::Crawled {
            id: RepoId::parse("octo/widgets").unwrap(),
            stored: true,
        }
    );
    assert!(p.crawler.crawl_state().await.is_empty());
}
