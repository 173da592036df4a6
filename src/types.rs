//! Core types and errors shared by the crawler, auditor and inspector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while crawling, auditing or inspecting.
#[derive(Error, Debug)]
pub enum LockscoutError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("API returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid manifest: {0}")]
    ManifestError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, LockscoutError>;

/// A repository as returned by the organization listing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Repository {
    /// Short repository name (e.g., "billing-service").
    pub name: String,
    /// Organization-qualified name (e.g., "acme/billing-service").
    pub full_name: String,
    /// Archived repositories are never fetched.
    #[serde(default)]
    pub archived: bool,
}

/// Result of asking the hosting API for one file of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Raw file content.
    Fetched(Vec<u8>),
    /// The repository has no such file.
    NotFound,
    /// The host asked us to back off for the given duration.
    RateLimited { retry_after: Duration },
}

/// Counters reported at the end of a crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Listing pages requested, including the terminating empty page.
    pub pages: u32,
    pub fetched: usize,
    pub cached: usize,
    pub not_found: usize,
    pub archived: usize,
    pub failed: usize,
}

/// Result of looking up one dependency name on the public registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryLookup {
    /// Package is published; `authors` is the registry's free-form author string.
    Found { authors: String },
    /// Registry answered with a non-success status.
    NotFound,
    /// Registry answered successfully but the body was not valid metadata.
    ParseError { error: String },
    /// No HTTP response at all (connect error, timeout).
    Failed { error: String },
}

/// Classification of every dependency name in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Published and authored by the organization.
    pub org: Vec<String>,
    /// Published by someone else.
    pub other: Vec<String>,
    /// Not published at all.
    pub missing: Vec<String>,
    /// Excluded from the counts above: registry body could not be parsed.
    pub parse_errors: Vec<String>,
    /// Excluded from the counts above: the request never got a response.
    pub failed: Vec<String>,
    /// Distinct author strings seen on `org` entries, first-seen order.
    pub org_authors: Vec<String>,
}

impl AuditReport {
    /// Names present on the registry at all.
    pub fn found_count(&self) -> usize {
        self.org.len() + self.other.len()
    }
}

/// A package source URL and the dependencies a lockfile resolves from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Remote {
    pub url: String,
    pub dependencies: BTreeSet<String>,
}

impl Remote {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains(name)
    }
}
