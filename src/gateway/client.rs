//! GitHub API client
//!
//! Minimal GitHub REST client for fetching repositories, contributors, and the repository index.

use crate::Result;
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use serde::Deserialize;
use url::Url;

/// Repository fields we need from `GET /repos/{owner}/{name}`
#[derive(Debug, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub watchers_count: Option<u64>,
    #[serde(default)]
    pub stargazers_count: Option<u64>,
}

/// One element of `GET /repos/{owner}/{name}/contributors`
///
/// Anonymous contributors come without a login or id.
#[derive(Debug, Deserialize)]
pub struct Contributor {
    pub login: Option<String>,
    pub id: Option<u64>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub gravatar_id: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    pub contributions: u64,
}

/// One element of `GET /repositories`
#[derive(Debug, Deserialize)]
pub struct IndexRepository {
    pub id: u64,
    pub full_name: String,
}

/// Rate limit information from response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

/// Classified outcome of a single HTTP request
#[derive(Debug)]
pub enum ApiResponse {
    /// 2xx - contains the response and optional rate limit info
    Success(reqwest::Response, Option<RateLimitInfo>),

    /// 403/429 - quota exhausted until `reset_at`
    RateLimited(RateLimitInfo),

    /// Not sent, requests are paused until the contained time
    Paused(DateTime<Utc>),

    /// 404
    NotFound,

    /// Transport error, timeout, or any other status
    Failed(ohno::AppError),
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Create a client that authenticates every request with `token`.
    pub fn new(token: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};

        let base_url = Url::parse(base_url).into_app_err_with(|| format!("parsing API endpoint '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(app_err!("API endpoint '{base_url}' cannot be used as a base URL"));
        }

        let mut auth_val = HeaderValue::from_str(&format!("token {token}"))?;
        auth_val.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert(AUTHORIZATION, auth_val);
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let http = reqwest::Client::builder()
            .user_agent(concat!("contrib-rank/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an API URL by appending percent-encoded path segments to the base URL.
    #[must_use]
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            let _ = path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issue a GET request and classify the result
    pub async fn api_call(&self, url: Url, now: DateTime<Utc>) -> ApiResponse {
        let resp = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ApiResponse::Failed(e.into()),
        };

        let rate_limit = extract_rate_limit_from_headers(resp.headers());

        let status = resp.status();
        if status.is_success() {
            return ApiResponse::Success(resp, rate_limit);
        }

        if let Some(info) = quota_refusal(status, resp.headers(), rate_limit, now) {
            return ApiResponse::RateLimited(info);
        }

        if status.as_u16() == 404 {
            return ApiResponse::NotFound;
        }

        let url = resp.url().clone();
        let body = resp.text().await.unwrap_or_default();
        ApiResponse::Failed(app_err!(
            "{url} response status {status}: {}",
            body.chars().take(200).collect::<String>()
        ))
    }
}

/// Extract rate limit information from API response headers
fn extract_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?.parse::<usize>().ok()?;

    let reset_timestamp = headers.get("x-ratelimit-reset")?.to_str().ok()?.parse::<i64>().ok()?;

    let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

    Some(RateLimitInfo { remaining, reset_at })
}

/// The quota refusal carried by a 403 or 429 response, if that is what it is.
///
/// GitHub also answers 403 for repositories it blocks or hides. Those responses still report
/// quota left and are plain failures, not a reason to stop talking to the API.
fn quota_refusal(status: StatusCode, headers: &HeaderMap, rate_limit: Option<RateLimitInfo>, now: DateTime<Utc>) -> Option<RateLimitInfo> {
    if !matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
        return None;
    }

    let retry_after = headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(chrono::Duration::try_seconds);
    if let Some(delay) = retry_after {
        return Some(RateLimitInfo {
            remaining: 0,
            reset_at: now + delay,
        });
    }

    match rate_limit {
        Some(info) if info.remaining == 0 => Some(info),
        _ if status == StatusCode::TOO_MANY_REQUESTS => Some(RateLimitInfo {
            remaining: 0,
            reset_at: now + chrono::Duration::hours(1),
        }),
        _ => None,
    }
}

/// Whether the `Link` header advertises another page
pub fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get(LINK)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|link| link.contains(r#"rel="next""#))
}
