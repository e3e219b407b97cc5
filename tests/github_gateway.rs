//! Integration tests for the GitHub gateway against a local mock of the REST API.

use chrono::{Duration as ChronoDuration, Utc};
use contrib_rank::gateway::{FetchResult, Gateway, GitHubGateway};
use contrib_rank::model::RepoId;
use core::time::Duration;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer, max_pages: u32) -> GitHubGateway {
    GitHubGateway::new("test-token", &server.uri(), Duration::from_secs(5), max_pages).unwrap()
}

fn repo_id(s: &str) -> RepoId {
    RepoId::parse(s).unwrap()
}

fn contributor(login: &str, contributions: u64) -> serde_json::Value {
    json!({
        "login": login,
        "id": 7,
        "avatar_url": format!("https://avatars.example/{login}"),
        "gravatar_id": "",
        "html_url": format!("https://github.com/{login}"),
        "contributions": contributions,
    })
}

#[tokio::test]
async fn test_get_repository_uses_watchers_as_weight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets"))
        .and(header("authorization", "token test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "full_name": "Octo/Widgets",
            "html_url": "https://github.com/Octo/Widgets",
            "watchers_count": 120,
            "stargazers_count": 120,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let FetchResult::Found(meta) = gateway(&server, 10).get_repository(&repo_id("octo/widgets")).await else {
        panic!("expected the repository to be found");
    };

    assert_eq!(meta.id, 42);
    assert_eq!(meta.full_name.as_str(), "Octo/Widgets");
    assert_eq!(meta.html_url, "https://github.com/Octo/Widgets");
    assert_eq!(meta.weight, 120);
}

#[tokio::test]
async fn test_get_repository_falls_back_to_stargazers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "full_name": "octo/widgets",
            "html_url": "https://github.com/octo/widgets",
            "stargazers_count": 33,
        })))
        .mount(&server)
        .await;

    let FetchResult::Found(meta) = gateway(&server, 10).get_repository(&repo_id("octo/widgets")).await else {
        panic!("expected the repository to be found");
    };
    assert_eq!(meta.weight, 33);
}

#[tokio::test]
async fn test_get_repository_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let result = gateway(&server, 10).get_repository(&repo_id("octo/missing")).await;
    assert!(matches!(result, FetchResult::NotFound));
}

#[tokio::test]
async fn test_server_error_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let result = gateway(&server, 10).get_repository(&repo_id("octo/widgets")).await;
    let FetchResult::Failed(e) = result else {
        panic!("expected a failure, got {result:?}");
    };
    assert!(e.to_string().contains("502"));
}

#[tokio::test]
async fn test_contributors_follow_next_links() {
    let server = MockServer::start().await;
    let next = format!(
        "<{}/repos/octo/widgets/contributors?per_page=100&page=2>; rel=\"next\"",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/contributors"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next.as_str())
                .set_body_json(json!([
                    contributor("alice", 90),
                    { "type": "Anonymous", "contributions": 50 },
                    contributor("idle", 0),
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/contributors"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([contributor("bob", 10)])))
        .expect(1)
        .mount(&server)
        .await;

    let FetchResult::Found(entries) = gateway(&server, 10).get_contributors(&repo_id("octo/widgets")).await else {
        panic!("expected contributors");
    };

    let logins: Vec<_> = entries.iter().map(|e| (e.login.as_str(), e.contributions)).collect();
    assert_eq!(logins, vec![("alice", 90), ("bob", 10)]);
    assert_eq!(entries[0].gravatar_id, None);
}

#[tokio::test]
async fn test_contributors_stop_at_page_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/contributors"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", "<http://unused/?page=2>; rel=\"next\"")
                .set_body_json(json!([contributor("alice", 5)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let FetchResult::Found(entries) = gateway(&server, 1).get_contributors(&repo_id("octo/widgets")).await else {
        panic!("expected contributors");
    };
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_contributors_no_content_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/empty/contributors"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let FetchResult::Found(entries) = gateway(&server, 10).get_contributors(&repo_id("octo/empty")).await else {
        panic!("expected an empty contributor list");
    };
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_list_repositories_passes_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repositories"))
        .and(query_param("since", "369"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 370, "full_name": "a/one" },
            { "id": 371, "full_name": "not-a-repo-id" },
            { "id": 372, "full_name": "b/two" },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let FetchResult::Found(entries) = gateway(&server, 10).list_repositories(Some(369)).await else {
        panic!("expected an index page");
    };

    let ids: Vec<_> = entries.iter().map(|e| (e.id, e.full_name.as_str())).collect();
    assert_eq!(ids, vec![(370, "a/one"), (372, "b/two")]);
}

#[tokio::test]
async fn test_rate_limit_pauses_later_calls() {
    let server = MockServer::start().await;
    let reset = Utc::now() + ChronoDuration::minutes(10);

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.timestamp().to_string().as_str())
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server, 10);

    let FetchResult::RateLimited(info) = gateway.get_repository(&repo_id("octo/widgets")).await else {
        panic!("expected a rate limit");
    };
    assert_eq!(info.remaining, 0);
    assert_eq!(info.reset_at.timestamp(), reset.timestamp());
    assert!(gateway.paused_until().is_some());

    // answered locally; the mock would fail its expectation on a second hit
    let second = gateway.get_repository(&repo_id("octo/widgets")).await;
    assert!(matches!(second, FetchResult::Paused(_)));
    let index = gateway.list_repositories(None).await;
    assert!(matches!(index, FetchResult::Paused(_)));
}

#[tokio::test]
async fn test_forbidden_with_quota_left_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/blocked/repo"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "4999")
                .insert_header("x-ratelimit-reset", (Utc::now().timestamp() + 3600).to_string().as_str())
                .set_body_json(json!({ "message": "Repository access blocked" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let gateway = gateway(&server, 10);

    let FetchResult::Failed(e) = gateway.get_repository(&repo_id("blocked/repo")).await else {
        panic!("expected a failure");
    };
    assert!(e.to_string().contains("403"), "{e}");
    assert!(gateway.paused_until().is_none());

    // still sent to the server, nothing was paused
    let second = gateway.get_repository(&repo_id("blocked/repo")).await;
    assert!(matches!(second, FetchResult::Failed(_)));
}

#[tokio::test]
async fn test_retry_after_pauses_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repositories"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "4000")
                .insert_header("retry-after", "120"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server, 10);
    let before = Utc::now();

    assert!(matches!(gateway.list_repositories(None).await, FetchResult::RateLimited(_)));
    let paused_until = gateway.paused_until().unwrap();
    assert!(paused_until >= before + ChronoDuration::seconds(120));
    assert!(paused_until <= Utc::now() + ChronoDuration::seconds(120));
}

#[tokio::test]
async fn test_rate_limit_pause_is_capped() {
    let server = MockServer::start().await;
    let reset = Utc::now() + ChronoDuration::hours(6);

    Mock::given(method("GET"))
        .and(path("/repositories"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.timestamp().to_string().as_str()),
        )
        .mount(&server)
        .await;

    let gateway = gateway(&server, 10);
    let result = gateway.list_repositories(None).await;
    assert!(matches!(result, FetchResult::RateLimited(_)));

    let paused_until = gateway.paused_until().unwrap();
    assert!(paused_until <= Utc::now() + ChronoDuration::hours(1));
}
