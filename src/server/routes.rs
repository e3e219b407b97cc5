use super::QueryService;
use super::views::{render_crawl, render_error, render_find, render_home, render_user};
use crate::Result;
use crate::crawler::CrawlRejection;
use crate::gateway::Gateway;
use crate::store::Store;
use axum::Router;
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use std::sync::Arc;

const LOG_TARGET: &str = "    server";

#[derive(Debug, Deserialize)]
struct CrawlForm {
    #[serde(rename = "repoId")]
    repo_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindQuery {
    user: Option<String>,
}

/// The HTTP surface: the home page, the rank lookup, per-user breakdowns, and crawl requests.
pub fn router<S: Store, G: Gateway>(service: Arc<QueryService<S, G>>) -> Router {
    Router::new()
        .route("/", get(home::<S, G>))
        .route("/find", get(find::<S, G>))
        .route("/crawl", post(crawl::<S, G>))
        .route("/user/{login}", get(user::<S, G>))
        .with_state(service)
}

async fn home<S: Store, G: Gateway>(State(service): State<Arc<QueryService<S, G>>>) -> Response {
    let view = service.home();
    page(StatusCode::OK, |out| render_home(&view, out))
}

async fn find<S: Store, G: Gateway>(State(service): State<Arc<QueryService<S, G>>>, Query(query): Query<FindQuery>) -> Response {
    let login = query.user.as_deref().unwrap_or_default().trim();
    if login.is_empty() {
        return page(StatusCode::BAD_REQUEST, |out| render_error("Enter a GitHub login to look up.", out));
    }

    let window = service.find_rank(login);
    let status = if window.is_some() { StatusCode::OK } else { StatusCode::NOT_FOUND };
    page(status, |out| render_find(login, window.as_ref(), out))
}

async fn crawl<S: Store, G: Gateway>(State(service): State<Arc<QueryService<S, G>>>, Form(form): Form<CrawlForm>) -> Response {
    let repo_id = form.repo_id.unwrap_or_default();
    let outcome = service.crawl_request(&repo_id).await;

    let status = match &outcome {
        Ok(_) => StatusCode::ACCEPTED,
        Err(CrawlRejection::Invalid(_)) => StatusCode::BAD_REQUEST,
        Err(CrawlRejection::Cooldown { .. }) => StatusCode::TOO_MANY_REQUESTS,
        Err(CrawlRejection::Store(e)) => {
            log::error!(target: LOG_TARGET, "Could not queue a crawl of '{}': {e:#}", repo_id.trim());
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    page(status, |out| render_crawl(repo_id.trim(), &outcome, out))
}

async fn user<S: Store, G: Gateway>(State(service): State<Arc<QueryService<S, G>>>, Path(login): Path<String>) -> Response {
    match service.user_breakdown(&login) {
        Some(breakdown) => page(StatusCode::OK, |out| render_user(&breakdown, out)),
        None => page(StatusCode::NOT_FOUND, |out| {
            render_error(&format!("{login} is not on the leaderboard."), out)
        }),
    }
}

fn page(status: StatusCode, render: impl FnOnce(&mut String) -> Result<()>) -> Response {
    let mut out = String::new();
    match render(&mut out) {
        Ok(()) => (status, Html(out)).into_response(),
        Err(e) => {
            log::error!(target: LOG_TARGET, "Could not render page: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}
