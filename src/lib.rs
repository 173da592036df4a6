//! lockscout - organization lockfile crawler and public registry auditor.
//!
//! This library provides the pieces behind the `lockscout` binary:
//! - Crawling every repository of an organization for one named lockfile
//! - Auditing which private dependency names are published on the public
//!   registry, and by whom
//! - Parsing downloaded lockfiles to list remotes and find dependencies
//!   resolved from the wrong one
//!
//! # Example
//!
//! ```no_run
//! use lockscout::crawler::{Crawler, GithubClient};
//! use lockscout::config::CrawlConfig;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = CrawlConfig::parse_from(["crawl", "Gemfile.lock"]);
//!     let settings = config.settings().unwrap();
//!     let client = GithubClient::new(&settings).unwrap();
//!     let summary = Crawler::new(client, settings).run().await.unwrap();
//!     println!("Fetched {} lockfiles", summary.fetched);
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod inspector;
pub mod lockfile;
pub mod notify;
pub mod registry;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::{AnalyzeConfig, AuditConfig, Commands, Config, CrawlConfig, CrawlSettings, RemotesConfig};
pub use crawler::Crawler;
pub use inspector::Inspector;
pub use registry::{Auditor, Manifest};
pub use types::{
    AuditReport, CrawlSummary, FetchOutcome, LockscoutError, RegistryLookup, Remote, Repository,
    Result,
};
