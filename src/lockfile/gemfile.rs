//! `Gemfile.lock` parser.
//!
//! ```text
//! GEM
//!   remote: https://rubygems.org/
//!   specs:
//!     actioncable (5.2.2)
//!       actionpack (= 5.2.2)
//! ```
//!
//! Remotes and `specs:` sit at two spaces, resolved gems at four, and their
//! own requirements at six (ignored).

use crate::lockfile::LockRemotes;
use regex::Regex;

const REMOTE_PREFIX: &str = "  remote:";
const SPECS_PREFIX: &str = "  specs:";

/// Parser for Bundler lockfiles.
#[derive(Clone)]
pub struct GemfileParser {
    dependency_pattern: Regex,
}

impl GemfileParser {
    pub fn new() -> Self {
        Self {
            dependency_pattern: Regex::new(r"^\s{4}\S").unwrap(),
        }
    }

    pub fn parse(&self, content: &str) -> LockRemotes {
        let mut remotes = LockRemotes::new();
        let mut current_remote: Option<String> = None;
        let mut reading_specs = false;

        for line in content.lines() {
            if let Some(url) = line.strip_prefix(REMOTE_PREFIX) {
                let url = url.trim();
                remotes.add_remote(url);
                current_remote = Some(url.to_string());
            } else if current_remote.is_some() && line.starts_with(SPECS_PREFIX) {
                reading_specs = true;
            } else if reading_specs && self.dependency_pattern.is_match(line) {
                if let (Some(remote), Some(name)) =
                    (current_remote.as_deref(), line.split_whitespace().next())
                {
                    remotes.add_dependency(remote, name);
                }
            } else if line.trim().is_empty() {
                current_remote = None;
                reading_specs = false;
            }
        }

        remotes
    }
}

impl Default for GemfileParser {
    fn default() -> Self {
        Self::new()
    }
}
