//! Offline inspection of downloaded lockfiles.
//!
//! - `remotes`: every package source URL found across lockfiles
//! - `analyze`: private-registry dependencies resolved from other remotes

use crate::lockfile::{Ecosystem, LockParser, LockRemotes};
use crate::notify::ConsoleOutput;
use crate::registry::Manifest;
use crate::types::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the file `remotes` writes.
pub const REMOTES_FILE: &str = "remotes.json";

/// Mismatches found in one lockfile: remote URL -> dependencies.
pub type Mismatches = BTreeMap<String, Vec<String>>;

/// Reads lockfiles of one ecosystem.
pub struct Inspector {
    parser: LockParser,
    console: ConsoleOutput,
}

impl Inspector {
    pub fn new(ecosystem: Ecosystem, console: ConsoleOutput) -> Self {
        Self {
            parser: ecosystem.parser(),
            console,
        }
    }

    /// Parse one lockfile, printing its remotes in verbose mode.
    pub fn parse_file(&self, path: &Path) -> Result<LockRemotes> {
        let content = fs::read_to_string(path)?;
        let remotes = self.parser.parse(&content);
        debug!("{}: {} remotes", path.display(), remotes.len());

        if self.console.is_verbose() {
            self.console.print_remotes(path, &remotes);
        }

        Ok(remotes)
    }

    /// Union of remote URLs across `files`, filtered by `grep`.
    ///
    /// Unreadable files are logged and skipped.
    pub fn list_remotes(&self, files: &[PathBuf], grep: Option<&str>) -> BTreeSet<String> {
        let mut urls = BTreeSet::new();

        for path in files {
            self.console
                .print_progress(&format!("Parsing file: {}", path.display()));
            match self.parse_file(path) {
                Ok(remotes) => urls.extend(remotes.match_remote_urls(grep)),
                Err(e) => warn!("Error opening {}, skipping: {}", path.display(), e),
            }
        }

        urls
    }

    /// Mismatches per lockfile, only for files that have any.
    pub fn analyze(&self, files: &[PathBuf], manifest: &Manifest) -> Result<Vec<(PathBuf, Mismatches)>> {
        let registry_url = manifest.registry_url()?;
        let mut results = Vec::new();

        for path in files {
            let remotes = match self.parse_file(path) {
                Ok(remotes) => remotes,
                Err(e) => {
                    warn!("Error opening {}, skipping: {}", path.display(), e);
                    continue;
                }
            };

            let mismatches = remotes.dependency_mismatches(registry_url, manifest);
            if !mismatches.is_empty() {
                results.push((path.clone(), mismatches));
            }
        }

        Ok(results)
    }
}

/// Write the remote list as a JSON array into `output_dir`.
pub fn write_remotes(output_dir: &Path, urls: &BTreeSet<String>) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(REMOTES_FILE);
    fs::write(&path, serde_json::to_string_pretty(urls)?)?;
    Ok(path)
}

/// Write one lockfile's mismatches to `<output_dir>/<stem>_output.json`.
pub fn write_mismatches(output_dir: &Path, lock_file: &Path, mismatches: &Mismatches) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let stem = lock_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lockfile".to_string());
    let path = output_dir.join(format!("{}_output.json", stem));
    fs::write(&path, serde_json::to_string_pretty(mismatches)?)?;
    Ok(path)
}
