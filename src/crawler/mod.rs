//! Organization-wide lockfile crawler.
//!
//! Pages through every repository of an organization and downloads one named
//! file from each, accumulating results in a local cache directory across
//! runs:
//! - archived repositories are skipped
//! - repositories already cached are never fetched again
//! - rate-limited fetches sleep for the server's delay and retry in place
//! - a missing file is logged and skipped

pub mod cache;
pub mod github;
pub mod retry;

pub use cache::LockCache;
pub use github::{GithubClient, RepoHost};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

use crate::config::CrawlSettings;
use crate::notify::ConsoleOutput;
use crate::types::{CrawlSummary, FetchOutcome, Repository, Result};
use tracing::{debug, trace, warn};

/// What happened to one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepoStatus {
    Fetched,
    Cached,
    NotFound,
    Failed,
}

/// Crawler over a [`RepoHost`], sleeping through a [`Sleeper`].
pub struct Crawler<H, S = TokioSleeper> {
    host: H,
    sleeper: S,
    settings: CrawlSettings,
    cache: LockCache,
    console: ConsoleOutput,
}

impl<H: RepoHost> Crawler<H, TokioSleeper> {
    /// Create a new crawler writing into the settings' output directory.
    pub fn new(host: H, settings: CrawlSettings) -> Self {
        let cache = LockCache::new(settings.output_dir.clone());
        Self {
            host,
            sleeper: TokioSleeper,
            settings,
            cache,
            console: ConsoleOutput::default(),
        }
    }
}

impl<H: RepoHost, S: Sleeper> Crawler<H, S> {
    /// Replace the sleeper used for rate-limit backoff.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> Crawler<H, T> {
        Crawler {
            host: self.host,
            sleeper,
            settings: self.settings,
            cache: self.cache,
            console: self.console,
        }
    }

    pub fn with_console(mut self, console: ConsoleOutput) -> Self {
        self.console = console;
        self
    }

    pub fn cache(&self) -> &LockCache {
        &self.cache
    }

    /// Crawl every page until the listing comes back empty.
    ///
    /// Listing errors abort the crawl; per-repository errors are logged and
    /// counted.
    pub async fn run(&self) -> Result<CrawlSummary> {
        self.cache.ensure_dir()?;

        let mut summary = CrawlSummary::default();
        let mut page = 1;

        loop {
            summary.pages += 1;
            let repositories = self
                .host
                .list_repositories(&self.settings.org, page, self.settings.public_only)
                .await?;

            if repositories.is_empty() {
                debug!("Page {} is empty, crawl complete", page);
                break;
            }

            self.console.print_progress(&format!(
                "Page {}: {} repositories",
                page,
                repositories.len()
            ));

            for repo in &repositories {
                if repo.archived {
                    trace!("Skipping archived repository {}", repo.full_name);
                    summary.archived += 1;
                    continue;
                }

                match self.process_repository(repo).await {
                    RepoStatus::Fetched => summary.fetched += 1,
                    RepoStatus::Cached => summary.cached += 1,
                    RepoStatus::NotFound => summary.not_found += 1,
                    RepoStatus::Failed => summary.failed += 1,
                }
            }

            page += 1;
        }

        Ok(summary)
    }

    async fn process_repository(&self, repo: &Repository) -> RepoStatus {
        let filename = &self.settings.filename;

        if self.cache.contains(&repo.name) {
            self.console
                .print_skip(&format!("{} already exists for {}", filename, repo.name));
            return RepoStatus::Cached;
        }

        let mut retries = 0;
        loop {
            match self.host.fetch_file(repo, filename).await {
                Ok(FetchOutcome::Fetched(content)) => {
                    return match self.cache.store(&repo.name, &content) {
                        Ok(path) => {
                            debug!("Wrote {} bytes to {}", content.len(), path.display());
                            self.console
                                .print_success(&format!("Fetched {} for {}", filename, repo.name));
                            RepoStatus::Fetched
                        }
                        Err(e) => {
                            self.console.print_failure(&format!(
                                "Could not write {} for {}: {}",
                                filename, repo.name, e
                            ));
                            RepoStatus::Failed
                        }
                    };
                }
                Ok(FetchOutcome::NotFound) => {
                    self.console
                        .print_failure(&format!("{} not found for {}", filename, repo.name));
                    return RepoStatus::NotFound;
                }
                Ok(FetchOutcome::RateLimited { retry_after }) => {
                    if !self.settings.retry.allows_retry(retries) {
                        warn!(
                            "Giving up on {} after {} rate-limit retries",
                            repo.full_name, retries
                        );
                        self.console.print_failure(&format!(
                            "Rate limit retries exhausted for {}",
                            repo.name
                        ));
                        return RepoStatus::Failed;
                    }
                    retries += 1;
                    self.console.print_warning(&format!(
                        "Rate limit exceeded. Sleeping for {} seconds.",
                        retry_after.as_secs()
                    ));
                    self.sleeper.sleep(retry_after).await;
                }
                Err(e) => {
                    self.console.print_failure(&format!(
                        "Failed to fetch {} for {}: {}",
                        filename, repo.name, e
                    ));
                    return RepoStatus::Failed;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_base_url;
    use crate::types::LockscoutError;
    use std::collections::{HashMap, VecDeque};
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory host: fixed pages, scripted fetch outcomes per repository.
    #[derive(Default)]
    struct FakeHost {
        pages: Vec<Vec<Repository>>,
        outcomes: Mutex<HashMap<String, VecDeque<FetchOutcome>>>,
        listed_pages: Mutex<Vec<u32>>,
        fetches: Mutex<Vec<String>>,
        fail_listing_at: Option<u32>,
    }

    impl FakeHost {
        fn new(pages: Vec<Vec<Repository>>) -> Self {
            Self {
                pages,
                ..Default::default()
            }
        }

        fn script(self, repo: &str, outcomes: Vec<FetchOutcome>) -> Self {
            self.outcomes
                .lock()
                .unwrap()
                .insert(repo.to_string(), outcomes.into());
            self
        }

        fn fetches(&self) -> Vec<String> {
            self.fetches.lock().unwrap().clone()
        }

        fn listed_pages(&self) -> Vec<u32> {
            self.listed_pages.lock().unwrap().clone()
        }
    }

    impl RepoHost for &FakeHost {
        async fn list_repositories(
            &self,
            _org: &str,
            page: u32,
            _public_only: bool,
        ) -> Result<Vec<Repository>> {
            self.listed_pages.lock().unwrap().push(page);
            if self.fail_listing_at == Some(page) {
                return Err(LockscoutError::ApiError {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self
                .pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default())
        }

        async fn fetch_file(&self, repo: &Repository, _path: &str) -> Result<FetchOutcome> {
            self.fetches.lock().unwrap().push(repo.name.clone());
            let next = self
                .outcomes
                .lock()
                .unwrap()
                .get_mut(&repo.name)
                .and_then(|queue| queue.pop_front());
            match next {
                Some(outcome) => Ok(outcome),
                None => Err(LockscoutError::ApiError {
                    status: 500,
                    message: "unscripted".to_string(),
                }),
            }
        }
    }

    /// Records requested delays instead of waiting.
    #[derive(Clone, Default)]
    struct RecordingSleeper {
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            self.slept.lock().unwrap().push(duration);
            std::future::ready(())
        }
    }

    fn repo(name: &str, archived: bool) -> Repository {
        Repository {
            name: name.to_string(),
            full_name: format!("acme/{}", name),
            archived,
        }
    }

    fn settings(output_dir: &Path, max_retries: Option<u32>) -> CrawlSettings {
        CrawlSettings {
            token: "t".to_string(),
            org: "acme".to_string(),
            filename: "Gemfile.lock".to_string(),
            public_only: false,
            api_url: parse_base_url("https://api.github.com").unwrap(),
            output_dir: output_dir.to_path_buf(),
            retry: RetryPolicy::new(max_retries),
            timeout_secs: 5,
        }
    }

    fn fetched(content: &str) -> FetchOutcome {
        FetchOutcome::Fetched(content.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_fetches_and_writes_underscored_name() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new(vec![vec![repo("web-app", false)]])
            .script("web-app", vec![fetched("GEM")]);

        let summary = Crawler::new(&host, settings(dir.path(), None))
            .with_sleeper(RecordingSleeper::default())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.fetched, 1);
        assert_eq!(fs::read(dir.path().join("web_app.lock")).unwrap(), b"GEM");
    }

    #[tokio::test]
    async fn test_cached_repository_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("web_app.lock"), b"old").unwrap();
        let host = FakeHost::new(vec![vec![repo("web-app", false)]])
            .script("web-app", vec![fetched("new")]);

        let summary = Crawler::new(&host, settings(dir.path(), None))
            .with_sleeper(RecordingSleeper::default())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.cached, 1);
        assert!(host.fetches().is_empty());
        assert_eq!(fs::read(dir.path().join("web_app.lock")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_archived_repository_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new(vec![vec![repo("legacy-app", true)]])
            .script("legacy-app", vec![fetched("GEM")]);

        let summary = Crawler::new(&host, settings(dir.path(), None))
            .with_sleeper(RecordingSleeper::default())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.archived, 1);
        assert!(host.fetches().is_empty());
        assert!(!dir.path().join("legacy_app.lock").exists());
    }

    #[tokio::test]
    async fn test_stops_at_first_empty_page() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new(vec![
            vec![repo("a", false)],
            vec![repo("b", false)],
            vec![],
            vec![repo("never", false)],
        ])
        .script("a", vec![FetchOutcome::NotFound])
        .script("b", vec![FetchOutcome::NotFound]);

        let summary = Crawler::new(&host, settings(dir.path(), None))
            .with_sleeper(RecordingSleeper::default())
            .run()
            .await
            .unwrap();

        assert_eq!(host.listed_pages(), vec![1, 2, 3]);
        assert_eq!(summary.pages, 3);
        assert_eq!(host.fetches(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_same_repository() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new(vec![vec![repo("a", false), repo("b", false)]])
            .script(
                "a",
                vec![
                    FetchOutcome::RateLimited {
                        retry_after: Duration::from_secs(7),
                    },
                    FetchOutcome::RateLimited {
                        retry_after: Duration::from_secs(2),
                    },
                    fetched("A"),
                ],
            )
            .script("b", vec![fetched("B")]);
        let sleeper = RecordingSleeper::default();

        let summary = Crawler::new(&host, settings(dir.path(), None))
            .with_sleeper(sleeper.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(host.fetches(), vec!["a", "a", "a", "b"]);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(7), Duration::from_secs(2)]
        );
        assert_eq!(summary.fetched, 2);
        assert_eq!(fs::read(dir.path().join("a.lock")).unwrap(), b"A");
    }

    #[tokio::test]
    async fn test_bounded_retry_gives_up_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let limited = FetchOutcome::RateLimited {
            retry_after: Duration::from_secs(1),
        };
        let host = FakeHost::new(vec![vec![repo("a", false), repo("b", false)]])
            .script("a", vec![limited.clone(), limited.clone(), limited])
            .script("b", vec![fetched("B")]);
        let sleeper = RecordingSleeper::default();

        let summary = Crawler::new(&host, settings(dir.path(), Some(2)))
            .with_sleeper(sleeper.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(sleeper.slept.lock().unwrap().len(), 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.fetched, 1);
        assert!(!dir.path().join("a.lock").exists());
    }

    #[tokio::test]
    async fn test_not_found_and_errors_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new(vec![vec![
            repo("missing", false),
            repo("broken", false),
            repo("ok", false),
        ]])
        .script("missing", vec![FetchOutcome::NotFound])
        .script("ok", vec![fetched("OK")]);

        let summary = Crawler::new(&host, settings(dir.path(), None))
            .with_sleeper(RecordingSleeper::default())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.fetched, 1);
        assert!(!dir.path().join("missing.lock").exists());
        assert!(dir.path().join("ok.lock").exists());
    }

    #[tokio::test]
    async fn test_listing_error_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FakeHost::new(vec![vec![repo("a", false)], vec![repo("b", false)]])
            .script("a", vec![fetched("A")]);
        host.fail_listing_at = Some(2);

        let result = Crawler::new(&host, settings(dir.path(), None))
            .with_sleeper(RecordingSleeper::default())
            .run()
            .await;

        assert!(matches!(result, Err(LockscoutError::ApiError { status: 500, .. })));
        assert_eq!(host.fetches(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = FakeHost::new(vec![vec![repo("web-app", false)]])
            .script("web-app", vec![fetched("v1")]);
        Crawler::new(&first, settings(dir.path(), None))
            .with_sleeper(RecordingSleeper::default())
            .run()
            .await
            .unwrap();

        let second = FakeHost::new(vec![vec![repo("web-app", false)]])
            .script("web-app", vec![fetched("v2")]);
        let summary = Crawler::new(&second, settings(dir.path(), None))
            .with_sleeper(RecordingSleeper::default())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.cached, 1);
        assert!(second.fetches().is_empty());
        assert_eq!(fs::read(dir.path().join("web_app.lock")).unwrap(), b"v1");
    }
}
