//! Lockfile parsing.
//!
//! Both parsers reduce a lockfile to the set of remotes (package source URLs)
//! it resolves against and the dependencies resolved from each:
//! - Ruby `Gemfile.lock`
//! - yarn v1 `yarn.lock`

pub mod gemfile;
pub mod yarn;

pub use gemfile::GemfileParser;
pub use yarn::YarnParser;

use crate::registry::Manifest;
use crate::types::{LockscoutError, Remote, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Which lockfile format to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    Ruby,
    Js,
}

impl Ecosystem {
    /// Parser for lockfiles of this ecosystem.
    pub fn parser(&self) -> LockParser {
        match self {
            Ecosystem::Ruby => LockParser::Gemfile(GemfileParser::new()),
            Ecosystem::Js => LockParser::Yarn(YarnParser::new()),
        }
    }
}

/// A parser built once and reused for every lockfile of a run.
#[derive(Clone)]
pub enum LockParser {
    Gemfile(GemfileParser),
    Yarn(YarnParser),
}

impl LockParser {
    pub fn parse(&self, content: &str) -> LockRemotes {
        match self {
            LockParser::Gemfile(parser) => parser.parse(content),
            LockParser::Yarn(parser) => parser.parse(content),
        }
    }
}

/// Remotes of one lockfile, keyed by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockRemotes {
    remotes: BTreeMap<String, Remote>,
}

impl LockRemotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_remote(&mut self, url: &str) {
        self.remotes
            .entry(url.to_string())
            .or_insert_with(|| Remote::new(url));
    }

    pub fn add_dependency(&mut self, url: &str, name: &str) {
        self.remotes
            .entry(url.to_string())
            .or_insert_with(|| Remote::new(url))
            .dependencies
            .insert(name.to_string());
    }

    pub fn get(&self, url: &str) -> Option<&Remote> {
        self.remotes.get(url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Remote> {
        self.remotes.values()
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    /// Remote URLs containing `grep` (case-insensitive); all of them without a filter.
    pub fn match_remote_urls(&self, grep: Option<&str>) -> Vec<String> {
        let needle = grep.map(str::to_lowercase).filter(|g| !g.is_empty());
        self.remotes
            .keys()
            .filter(|url| {
                needle
                    .as_ref()
                    .map_or(true, |needle| url.to_lowercase().contains(needle))
            })
            .cloned()
            .collect()
    }

    /// Remotes other than `registry_url` that resolve `dependency`.
    pub fn remotes_with_dependency_mismatch(&self, registry_url: &str, dependency: &str) -> Vec<String> {
        self.remotes
            .values()
            .filter(|remote| !same_remote(&remote.url, registry_url))
            .filter(|remote| remote.has_dependency(dependency))
            .map(|remote| remote.url.clone())
            .collect()
    }

    /// For each foreign remote, the manifest dependencies resolved from it.
    pub fn dependency_mismatches(
        &self,
        registry_url: &str,
        manifest: &Manifest,
    ) -> BTreeMap<String, Vec<String>> {
        let mut mismatches: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for dependency in &manifest.dependencies {
            for url in self.remotes_with_dependency_mismatch(registry_url, dependency) {
                mismatches.entry(url).or_default().push(dependency.clone());
            }
        }

        mismatches
    }
}

/// Remote URLs compare equal regardless of a trailing slash.
fn same_remote(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Lockfiles at `path`: the file itself, or the `.lock` files directly inside
/// a directory (sorted).
pub fn collect_lock_files(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(path)?;

    if metadata.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();
            if entry.file_type()?.is_file() && is_lock_file(&entry_path) {
                files.push(entry_path);
            }
        }
        files.sort();
        return Ok(files);
    }

    if is_lock_file(path) {
        Ok(vec![path.to_path_buf()])
    } else {
        Err(LockscoutError::ConfigError(format!(
            "{} is not a .lock file",
            path.display()
        )))
    }
}

fn is_lock_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "lock")
}
