//! On-disk lockfile cache.
//!
//! A file at `<dir>/<repo_name_with_underscores>.lock` marks a repository as
//! already fetched. Entries are written once and never overwritten.

use crate::types::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Extension of every cached lockfile.
pub const LOCK_EXTENSION: &str = "lock";

/// Cache of fetched lockfiles, keyed by repository name.
#[derive(Debug, Clone)]
pub struct LockCache {
    dir: PathBuf,
}

impl LockCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a repository: hyphens become underscores.
    pub fn cache_key(repo_name: &str) -> String {
        repo_name.replace('-', "_")
    }

    /// Path the lockfile of `repo_name` is stored at.
    pub fn path_for(&self, repo_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", Self::cache_key(repo_name), LOCK_EXTENSION))
    }

    pub fn contains(&self, repo_name: &str) -> bool {
        self.path_for(repo_name).exists()
    }

    /// Create the cache directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Write raw content for `repo_name`. Fails if an entry already exists.
    pub fn store(&self, repo_name: &str, content: &[u8]) -> Result<PathBuf> {
        self.write_entry(repo_name, |file| file.write_all(content))
    }

    /// Create the entry and fill it with `write`. A failed write removes the
    /// partial file so the repository is fetched again on the next run.
    fn write_entry<F>(&self, repo_name: &str, write: F) -> Result<PathBuf>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let path = self.path_for(repo_name);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;

        if let Err(e) = write(&mut file).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }

        Ok(path)
    }
}
