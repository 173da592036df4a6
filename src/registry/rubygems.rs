//! rubygems.org client for package author lookups.

use crate::types::{RegistryLookup, Result};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Public registry that can describe a package by name.
pub trait PackageRegistry {
    fn lookup(&self, name: &str) -> impl Future<Output = RegistryLookup> + Send;
}

/// rubygems.org API response for gem info.
#[derive(Debug, Deserialize)]
struct GemInfo {
    #[serde(default)]
    authors: Option<String>,
}

/// Client for `GET /api/v1/gems/<name>.json`.
pub struct RubyGemsClient {
    client: Client,
    base_url: Url,
    rate_limiter: Arc<RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>>,
}

impl RubyGemsClient {
    /// Create a new client paced at `rate_limit` requests per second.
    pub fn new(base_url: Url, timeout_secs: u64, rate_limit: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("lockscout/0.1")
            .build()?;

        let quota = Quota::per_second(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client,
            base_url,
            rate_limiter,
        })
    }

    fn gem_url(&self, name: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("api/v1/gems/{}.json", urlencoding::encode(name)))?)
    }
}

impl PackageRegistry for RubyGemsClient {
    async fn lookup(&self, name: &str) -> RegistryLookup {
        let url = match self.gem_url(name) {
            Ok(url) => url,
            Err(e) => {
                return RegistryLookup::Failed {
                    error: e.to_string(),
                }
            }
        };

        self.rate_limiter.until_ready().await;
        trace!("Checking rubygems: {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return RegistryLookup::Failed {
                    error: e.to_string(),
                }
            }
        };

        if !response.status().is_success() {
            debug!("Gem NOT FOUND: {} (HTTP {})", name, response.status());
            return RegistryLookup::NotFound;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return RegistryLookup::Failed {
                    error: e.to_string(),
                }
            }
        };

        match serde_json::from_str::<GemInfo>(&body) {
            Ok(info) => RegistryLookup::Found {
                authors: info.authors.unwrap_or_default(),
            },
            Err(e) => RegistryLookup::ParseError {
                error: e.to_string(),
            },
        }
    }
}
