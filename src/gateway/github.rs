use super::client::{ApiResponse, Client, Contributor, IndexRepository, Repository, has_next_page};
use super::{FetchResult, Gateway, RateLimitInfo, Throttler};
use crate::Result;
use crate::model::{ContributorEntry, IndexEntry, RepoId, RepoMeta};
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::{EnrichableExt, IntoAppError};
use serde::de::DeserializeOwned;
use url::Url;

const LOG_TARGET: &str = "   gateway";

/// Contributors requested per page, the maximum GitHub allows.
const CONTRIBUTORS_PER_PAGE: &str = "100";

/// Concurrent requests in flight against the API.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// A pause is never longer than this, whatever reset time the server reports.
const MAX_PAUSE: chrono::Duration = chrono::Duration::hours(1);

/// Early-return from a function returning `FetchResult` when the API call did not succeed.
macro_rules! unwrap_or_return {
    ($expr:expr) => {
        match $expr {
            ApiResponse::Success(resp, _) => resp,
            ApiResponse::RateLimited(info) => return FetchResult::RateLimited(info),
            ApiResponse::Paused(until) => return FetchResult::Paused(until),
            ApiResponse::NotFound => return FetchResult::NotFound,
            ApiResponse::Failed(e) => return FetchResult::Failed(e),
        }
    };
}

/// [`Gateway`] backed by the GitHub REST API.
#[derive(Debug)]
pub struct GitHubGateway {
    client: Client,
    throttler: Throttler,
    max_contributor_pages: u32,
}

impl GitHubGateway {
    /// Create a gateway that talks to `endpoint` (normally `https://api.github.com`).
    ///
    /// Every request is bounded by `timeout`. At most `max_contributor_pages` pages of contributors
    /// are fetched per repository.
    pub fn new(token: &str, endpoint: &str, timeout: Duration, max_contributor_pages: u32) -> Result<Self> {
        Ok(Self {
            client: Client::new(token, endpoint, timeout)?,
            throttler: Throttler::new(MAX_CONCURRENT_REQUESTS),
            max_contributor_pages: max_contributor_pages.max(1),
        })
    }

    /// Perform one throttled request, pausing further requests when the quota is exhausted.
    async fn call(&self, url: Url) -> ApiResponse {
        let now = Utc::now();
        let _permit = match self.throttler.acquire(now).await {
            Ok(permit) => permit,
            Err(reset_at) => {
                log::debug!(target: LOG_TARGET, "Skipping request to {url}, rate limited until {reset_at}");
                return ApiResponse::Paused(reset_at);
            }
        };

        log::debug!(target: LOG_TARGET, "GET {url}");
        let response = self.client.api_call(url, now).await;

        match &response {
            ApiResponse::RateLimited(info) => self.pause(*info, now),
            ApiResponse::Success(_, Some(info)) if info.remaining == 0 => self.pause(*info, now),
            _ => {}
        }

        response
    }

    fn pause(&self, info: RateLimitInfo, now: DateTime<Utc>) {
        let resume_at = info.reset_at.min(now + MAX_PAUSE);
        if self.throttler.pause_until(resume_at) {
            log::warn!(target: LOG_TARGET, "GitHub rate limit exhausted, pausing requests until {resume_at}");
        }
    }
}

impl Gateway for GitHubGateway {
    async fn get_repository(&self, id: &RepoId) -> FetchResult<RepoMeta> {
        let url = self.client.url(&["repos", id.owner(), id.name()]);
        let resp = unwrap_or_return!(self.call(url).await);

        let repo: Repository = match decode(resp).await {
            Ok(repo) => repo,
            Err(e) => return FetchResult::Failed(e.enrich_with(|| format!("decoding repository '{id}'"))),
        };

        let full_name = RepoId::parse(&repo.full_name).unwrap_or_else(|_| id.clone());
        FetchResult::Found(RepoMeta {
            id: repo.id,
            full_name,
            html_url: repo.html_url,
            weight: repo.watchers_count.or(repo.stargazers_count).unwrap_or(0),
        })
    }

    async fn get_contributors(&self, id: &RepoId) -> FetchResult<Vec<ContributorEntry>> {
        let mut contributors = Vec::new();

        for page in 1..=self.max_contributor_pages {
            let mut url = self.client.url(&["repos", id.owner(), id.name(), "contributors"]);
            let _ = url
                .query_pairs_mut()
                .append_pair("per_page", CONTRIBUTORS_PER_PAGE)
                .append_pair("page", &page.to_string());

            let resp = unwrap_or_return!(self.call(url).await);

            // GitHub answers 204 for empty repositories
            if resp.status() == reqwest::StatusCode::NO_CONTENT {
                break;
            }

            let more = has_next_page(resp.headers());
            let batch: Vec<Contributor> = match decode(resp).await {
                Ok(batch) => batch,
                Err(e) => return FetchResult::Failed(e.enrich_with(|| format!("decoding contributors of '{id}' (page {page})"))),
            };

            contributors.extend(batch.into_iter().filter_map(into_entry));

            if !more {
                return FetchResult::Found(contributors);
            }
        }

        if !contributors.is_empty() {
            log::debug!(
                target: LOG_TARGET,
                "Stopped after {} contributor page(s) for '{id}'",
                self.max_contributor_pages
            );
        }

        FetchResult::Found(contributors)
    }

    async fn list_repositories(&self, since: Option<u64>) -> FetchResult<Vec<IndexEntry>> {
        let mut url = self.client.url(&["repositories"]);
        if let Some(since) = since {
            let _ = url.query_pairs_mut().append_pair("since", &since.to_string());
        }

        let resp = unwrap_or_return!(self.call(url).await);
        let page: Vec<IndexRepository> = match decode(resp).await {
            Ok(page) => page,
            Err(e) => return FetchResult::Failed(e.enrich_with(|| format!("decoding repository index after {since:?}"))),
        };

        let entries = page
            .into_iter()
            .filter_map(|repo| match RepoId::parse(&repo.full_name) {
                Ok(full_name) => Some(IndexEntry { id: repo.id, full_name }),
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Ignoring index entry {}: {e}", repo.id);
                    None
                }
            })
            .collect();

        FetchResult::Found(entries)
    }

    fn paused_until(&self) -> Option<DateTime<Utc>> {
        self.throttler.paused_until(Utc::now())
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let body = resp.bytes().await.into_app_err("reading response body")?;
    serde_json::from_slice(&body).into_app_err("parsing response body")
}

/// Anonymous contributors and zero-contribution entries carry no score.
fn into_entry(contributor: Contributor) -> Option<ContributorEntry> {
    if contributor.contributions == 0 {
        return None;
    }

    let login = contributor.login.filter(|login| !login.is_empty())?;
    let html_url = contributor
        .html_url
        .unwrap_or_else(|| format!("https://github.com/{login}"));

    Some(ContributorEntry {
        id: contributor.id.unwrap_or(0),
        avatar_url: contributor.avatar_url.unwrap_or_default(),
        gravatar_id: contributor.gravatar_id.filter(|g| !g.is_empty()),
        html_url,
        contributions: contributor.contributions,
        login,
    })
}
