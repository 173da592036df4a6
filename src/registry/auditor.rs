//! Ownership audit of manifest dependencies against a public registry.

use crate::notify::ConsoleOutput;
use crate::registry::PackageRegistry;
use crate::types::{AuditReport, LockscoutError, RegistryLookup, Result};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

/// Classifies each dependency as ours, someone else's, or unpublished.
pub struct Auditor<R> {
    registry: R,
    author_pattern: Regex,
    console: ConsoleOutput,
}

impl<R: PackageRegistry> Auditor<R> {
    /// Create a new auditor. `author_pattern` is matched case-insensitively.
    pub fn new(registry: R, author_pattern: &str) -> Result<Self> {
        let author_pattern = RegexBuilder::new(author_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| LockscoutError::ConfigError(format!("invalid author pattern: {}", e)))?;

        Ok(Self {
            registry,
            author_pattern,
            console: ConsoleOutput::default(),
        })
    }

    pub fn with_console(mut self, console: ConsoleOutput) -> Self {
        self.console = console;
        self
    }

    /// Whether an author string belongs to the organization.
    pub fn is_org_author(&self, authors: &str) -> bool {
        self.author_pattern.is_match(&authors.to_lowercase())
    }

    /// Look up every name in order, one request at a time.
    pub async fn audit(&self, names: &[String]) -> AuditReport {
        let mut report = AuditReport::default();
        let pb = self
            .console
            .create_progress_bar(names.len() as u64, "Checking registry");

        for name in names {
            self.console.print_progress(&format!("Checking {}...", name));

            match self.registry.lookup(name).await {
                RegistryLookup::Found { authors } => {
                    if self.is_org_author(&authors) {
                        debug!("{} is ours ({})", name, authors);
                        if !report.org_authors.contains(&authors) {
                            report.org_authors.push(authors);
                        }
                        report.org.push(name.clone());
                    } else {
                        debug!("{} is claimed by {:?}", name, authors);
                        report.other.push(name.clone());
                    }
                }
                RegistryLookup::NotFound => report.missing.push(name.clone()),
                RegistryLookup::ParseError { error } => {
                    warn!("Error parsing JSON for {}: {}", name, error);
                    report.parse_errors.push(name.clone());
                }
                RegistryLookup::Failed { error } => {
                    warn!("Lookup failed for {}: {}", name, error);
                    report.failed.push(name.clone());
                }
            }

            if let Some(ref pb) = pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        report
    }
}
