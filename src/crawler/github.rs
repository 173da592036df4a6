//! GitHub REST client for organization listings and raw file contents.

use crate::config::{CrawlSettings, PAGE_SIZE};
use crate::types::{FetchOutcome, LockscoutError, Repository, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};
use url::Url;

/// Delay used when a rate-limit response carries no usable hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";

/// A source-control host the crawler can list and fetch from.
pub trait RepoHost {
    /// One page (1-based) of the organization's repositories.
    fn list_repositories(
        &self,
        org: &str,
        page: u32,
        public_only: bool,
    ) -> impl Future<Output = Result<Vec<Repository>>> + Send;

    /// Raw content of `path` in `repo`.
    fn fetch_file(
        &self,
        repo: &Repository,
        path: &str,
    ) -> impl Future<Output = Result<FetchOutcome>> + Send;
}

/// Client for the GitHub REST API.
pub struct GithubClient {
    client: Client,
    api_url: Url,
}

impl GithubClient {
    /// Create a new client authenticated with the settings' token.
    pub fn new(settings: &CrawlSettings) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.token))
            .map_err(|_| LockscoutError::ConfigError("PAT contains invalid characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent("lockscout/0.1")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
        })
    }

    fn repos_url(&self, org: &str, page: u32, public_only: bool) -> Result<Url> {
        let mut url = self
            .api_url
            .join(&format!("orgs/{}/repos", urlencoding::encode(org)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("per_page", &PAGE_SIZE.to_string());
            query.append_pair("page", &page.to_string());
            if public_only {
                query.append_pair("type", "public");
            }
        }
        Ok(url)
    }

    fn contents_url(&self, repo: &Repository, path: &str) -> Result<Url> {
        let encoded_path = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(self
            .api_url
            .join(&format!("repos/{}/contents/{}", repo.full_name, encoded_path))?)
    }
}

impl RepoHost for GithubClient {
    async fn list_repositories(
        &self,
        org: &str,
        page: u32,
        public_only: bool,
    ) -> Result<Vec<Repository>> {
        let url = self.repos_url(org, page, public_only)?;
        trace!("Listing repositories: {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LockscoutError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let repositories: Vec<Repository> = response.json().await?;
        debug!("Page {} listed {} repositories", page, repositories.len());
        Ok(repositories)
    }

    async fn fetch_file(&self, repo: &Repository, path: &str) -> Result<FetchOutcome> {
        let url = self.contents_url(repo, path)?;
        trace!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, RAW_MEDIA_TYPE)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            return Ok(FetchOutcome::Fetched(bytes.to_vec()));
        }

        if status == StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }

        if let Some(retry_after) = rate_limit_delay(status, response.headers(), unix_now()) {
            return Ok(FetchOutcome::RateLimited { retry_after });
        }

        let message = response.text().await.unwrap_or_default();
        Err(LockscoutError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn header_secs(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

/// Decide whether a response is a rate-limit signal and how long to wait.
///
/// GitHub answers 429 for secondary limits and 403 with `retry-after` or
/// `x-ratelimit-remaining: 0` for primary ones. `retry-after` wins over
/// `x-ratelimit-reset` (an epoch timestamp).
pub fn rate_limit_delay(status: StatusCode, headers: &HeaderMap, now: u64) -> Option<Duration> {
    let retry_after = header_secs(headers, "retry-after");
    let exhausted = header_secs(headers, "x-ratelimit-remaining") == Some(0);

    let limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (retry_after.is_some() || exhausted));
    if !limited {
        return None;
    }

    if let Some(secs) = retry_after {
        return Some(Duration::from_secs(secs));
    }

    if let Some(reset) = header_secs(headers, "x-ratelimit-reset") {
        return Some(Duration::from_secs(reset.saturating_sub(now)));
    }

    Some(DEFAULT_RETRY_AFTER)
}
