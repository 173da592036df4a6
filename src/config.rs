//! Command-line and environment configuration.
//!
//! Everything is read once by clap at startup. The crawler additionally
//! validates its inputs into an immutable [`CrawlSettings`] value that is
//! passed down explicitly.

use crate::crawler::RetryPolicy;
use crate::lockfile::Ecosystem;
use crate::types::{LockscoutError, Result};
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

/// Directory every fetched lockfile is written to.
pub const OUTPUT_DIR: &str = "input";

/// Default hosting API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default public package registry.
pub const DEFAULT_REGISTRY_URL: &str = "https://rubygems.org";

/// Listing page size used by the crawler.
pub const PAGE_SIZE: u32 = 30;

/// Organization lockfile crawler and public registry ownership auditor.
#[derive(Parser, Debug, Clone)]
#[command(name = "lockscout")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Download a named file from every repository of an organization
    Crawl(CrawlConfig),
    /// Check which manifest dependencies are published on the public registry and by whom
    Audit(AuditConfig),
    /// List every remote found in lock files
    Remotes(RemotesConfig),
    /// Find registry dependencies resolved from the wrong remote
    Analyze(AnalyzeConfig),
}

/// Configuration for the crawl command.
#[derive(Parser, Debug, Clone)]
pub struct CrawlConfig {
    /// File to fetch from every repository (e.g. Gemfile.lock)
    pub filename: Option<String>,

    /// Personal access token
    #[arg(long, env = "PAT", hide_env_values = true)]
    pub token: Option<String>,

    /// Organization to crawl
    #[arg(long, env = "ORG")]
    pub org: Option<String>,

    /// Only list public repositories
    #[arg(long, env = "PUBLIC_REPO", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub public_only: bool,

    /// Hosting API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Give up on a repository after this many rate-limit retries (default: never)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

/// Validated crawler inputs.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub token: String,
    pub org: String,
    pub filename: String,
    pub public_only: bool,
    pub api_url: Url,
    pub output_dir: PathBuf,
    pub retry: RetryPolicy,
    pub timeout_secs: u64,
}

impl CrawlConfig {
    /// Validate the raw arguments. Nothing touches the network or disk here.
    pub fn settings(&self) -> Result<CrawlSettings> {
        let token = non_empty(self.token.as_deref());
        let org = non_empty(self.org.as_deref());

        let (token, org) = match (token, org) {
            (Some(token), Some(org)) => (token, org),
            _ => {
                return Err(LockscoutError::ConfigError(
                    "Please set the PAT and ORG environment variables.".to_string(),
                ))
            }
        };

        let filename = non_empty(self.filename.as_deref()).ok_or_else(|| {
            LockscoutError::ConfigError(
                "Please pass the file to fetch, e.g. `lockscout crawl Gemfile.lock`.".to_string(),
            )
        })?;

        Ok(CrawlSettings {
            token,
            org,
            filename,
            public_only: self.public_only,
            api_url: parse_base_url(&self.api_url)?,
            output_dir: PathBuf::from(OUTPUT_DIR),
            retry: RetryPolicy::new(self.max_retries),
            timeout_secs: self.timeout,
        })
    }
}

/// Configuration for the audit command.
#[derive(Parser, Debug, Clone)]
pub struct AuditConfig {
    /// Manifest with a `dependencies` collection
    #[arg(default_value = "registry.json")]
    pub manifest: PathBuf,

    /// Case-insensitive pattern matching the organization's author strings
    #[arg(long, default_value = "acme")]
    pub author_pattern: String,

    /// Public registry base URL
    #[arg(long, default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// Registry requests per second
    #[arg(long, default_value = "10")]
    pub rate_limit: u32,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

/// Lockfile flavour selection shared by `remotes` and `analyze`.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct EcosystemArgs {
    /// Parse Gemfile.lock files
    #[arg(long)]
    pub ruby: bool,

    /// Parse yarn.lock files
    #[arg(long)]
    pub js: bool,
}

impl EcosystemArgs {
    pub fn ecosystem(&self) -> Ecosystem {
        if self.ruby {
            Ecosystem::Ruby
        } else {
            Ecosystem::Js
        }
    }
}

/// Configuration for the remotes command.
#[derive(Parser, Debug, Clone)]
pub struct RemotesConfig {
    /// A lock file or a directory containing lock files
    #[arg(long)]
    pub path: PathBuf,

    #[command(flatten)]
    pub ecosystem: EcosystemArgs,

    /// Only keep remotes whose URL contains this substring (case-insensitive)
    #[arg(long)]
    pub grep: Option<String>,

    /// Directory remotes.json is written to
    #[arg(long, default_value = "remotes_output")]
    pub output_dir: PathBuf,
}

/// Configuration for the analyze command.
#[derive(Parser, Debug, Clone)]
pub struct AnalyzeConfig {
    /// A lock file or a directory containing lock files
    #[arg(long)]
    pub path: PathBuf,

    #[command(flatten)]
    pub ecosystem: EcosystemArgs,

    /// Private registry manifest (JSON with `url` and `dependencies`)
    #[arg(long, default_value = "registry.json")]
    pub registry: PathBuf,

    /// Directory mismatch reports are written to
    #[arg(long, default_value = "analyze_output")]
    pub output_dir: PathBuf,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse an API base URL, making sure relative joins keep its path.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
