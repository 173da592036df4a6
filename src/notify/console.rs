//! Colored console output for crawl, audit and inspection results.

use crate::lockfile::LockRemotes;
use crate::types::{AuditReport, CrawlSummary};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;

/// Console output handler with colors and formatting.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleOutput {
    verbose: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Print progress (only in verbose mode).
    pub fn print_progress(&self, message: &str) {
        if !self.verbose {
            return;
        }

        println!("{} {}", "[.]".dimmed(), message.dimmed());
    }

    /// Print info message.
    pub fn print_info(&self, message: &str) {
        println!("{} {}", "[*]".bright_blue(), message);
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", "[+]".green(), message);
    }

    pub fn print_skip(&self, message: &str) {
        println!("{} {}", "[=]".dimmed(), message);
    }

    pub fn print_warning(&self, message: &str) {
        println!("{} {}", "[!]".yellow(), message.yellow());
    }

    pub fn print_failure(&self, message: &str) {
        println!("{} {}", "[-]".red(), message);
    }

    /// Print the crawl counters.
    pub fn print_crawl_summary(&self, summary: &CrawlSummary) {
        println!();
        println!("{}", "=== Crawl Summary ===".bright_cyan());
        println!("  Pages:      {}", summary.pages);
        println!("  Fetched:    {}", summary.fetched.to_string().green());
        println!("  Cached:     {}", summary.cached);
        println!("  Not found:  {}", summary.not_found);
        println!("  Archived:   {}", summary.archived);
        if summary.failed > 0 {
            println!("  Failed:     {}", summary.failed.to_string().red().bold());
        } else {
            println!("  Failed:     0");
        }
        println!();
    }

    /// Print the ownership classification of an audit.
    pub fn print_audit_report(&self, report: &AuditReport, registry: &str) {
        println!();
        println!("{}", "=== Audit Summary ===".bright_cyan());
        println!(
            "  Dependencies found on {}: {}",
            registry,
            report.found_count()
        );
        println!("  Claimed by us:             {}", report.org.len());

        let other = format!("NOT claimed by us:         {}", report.other.len());
        if report.other.is_empty() {
            println!("  {}", other);
        } else {
            println!("  {}", other.red().bold());
            for name in &report.other {
                println!("    - {}", name);
            }
        }

        println!("  Missing from the registry: {}", report.missing.len());
        if self.verbose {
            for name in &report.missing {
                println!("    - {}", name.dimmed());
            }
        }

        println!(
            "  Author variants from our organization: {:?}",
            report.org_authors
        );

        if !report.parse_errors.is_empty() {
            println!(
                "  {}",
                format!(
                    "Unparseable registry responses (not counted above): {}",
                    report.parse_errors.len()
                )
                .yellow()
            );
            for name in &report.parse_errors {
                println!("    - {}", name.dimmed());
            }
        }

        if !report.failed.is_empty() {
            println!(
                "  {}",
                format!("Failed lookups (not counted above): {}", report.failed.len()).yellow()
            );
            for name in &report.failed {
                println!("    - {}", name.dimmed());
            }
        }

        println!();
    }

    /// Print every remote of a parsed lockfile with its dependencies.
    pub fn print_remotes(&self, path: &Path, remotes: &LockRemotes) {
        println!("{} {}", "===".bright_cyan(), path.display().to_string().bright_white());
        for remote in remotes.iter() {
            println!("  {}", remote.url.bold());
            for dependency in &remote.dependencies {
                println!("    {}", dependency.dimmed());
            }
        }
    }

    /// Print the registry dependencies a lockfile resolves from foreign remotes.
    pub fn print_mismatches(&self, path: &Path, mismatches: &BTreeMap<String, Vec<String>>) {
        println!(
            "{} Dependency mismatches found for {}",
            "[!]".red().bold(),
            path.display()
        );
        for (remote, dependencies) in mismatches {
            println!("    |-- {}", remote.yellow());
            for dependency in dependencies {
                println!("    |     {}", dependency);
            }
        }
    }

    /// Create a progress bar. Verbose mode logs each item instead.
    pub fn create_progress_bar(&self, total: u64, message: &str) -> Option<ProgressBar> {
        if self.verbose {
            return None;
        }

        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(message.to_string());
        Some(pb)
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_output_creation() {
        assert!(ConsoleOutput::new(true).is_verbose());
        assert!(!ConsoleOutput::default().is_verbose());
    }

    #[test]
    fn test_progress_bar_hidden_in_verbose_mode() {
        assert!(ConsoleOutput::new(true).create_progress_bar(3, "x").is_none());
        let pb = ConsoleOutput::new(false).create_progress_bar(3, "x").unwrap();
        assert_eq!(pb.length(), Some(3));
    }
}
