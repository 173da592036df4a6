//! lockscout - organization lockfile crawler and public registry auditor.
//!
//! CLI entry point.

use clap::Parser;
use lockscout::config::parse_base_url;
use lockscout::crawler::{Crawler, GithubClient};
use lockscout::inspector::{write_mismatches, write_remotes, Inspector};
use lockscout::lockfile::collect_lock_files;
use lockscout::notify::ConsoleOutput;
use lockscout::registry::{Auditor, Manifest, RubyGemsClient};
use lockscout::{
    AnalyzeConfig, AuditConfig, Commands, Config, CrawlConfig, LockscoutError, RemotesConfig,
};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging
    let filter = match EnvFilter::try_from_env("LOCKSCOUT_LOG") {
        Ok(filter) => filter,
        Err(_) if config.verbose => EnvFilter::new("lockscout=debug,info"),
        Err(_) => EnvFilter::new("lockscout=info,warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let console = ConsoleOutput::new(config.verbose);

    let outcome = match config.command {
        Commands::Crawl(crawl_config) => run_crawl(crawl_config, console).await,
        Commands::Audit(audit_config) => run_audit(audit_config, console).await,
        Commands::Remotes(remotes_config) => run_remotes(remotes_config, console),
        Commands::Analyze(analyze_config) => run_analyze(analyze_config, console),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

async fn run_crawl(crawl_config: CrawlConfig, console: ConsoleOutput) -> Result<(), ExitCode> {
    let settings = match crawl_config.settings() {
        Ok(s) => s,
        Err(LockscoutError::ConfigError(msg)) => {
            eprintln!("Error: {}", msg);
            return Err(ExitCode::FAILURE);
        }
        Err(e) => {
            error!("Invalid crawl settings: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let client = match GithubClient::new(&settings) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create API client: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    info!(
        "Crawling {} for {} into {}/",
        settings.org,
        settings.filename,
        settings.output_dir.display()
    );

    let crawler = Crawler::new(client, settings).with_console(console);
    match crawler.run().await {
        Ok(summary) => {
            console.print_crawl_summary(&summary);
            Ok(())
        }
        Err(e) => {
            error!("An error occurred: {}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

async fn run_audit(audit_config: AuditConfig, console: ConsoleOutput) -> Result<(), ExitCode> {
    let manifest = match Manifest::load(&audit_config.manifest) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to load manifest: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let registry_url = match parse_base_url(&audit_config.registry_url) {
        Ok(u) => u,
        Err(e) => {
            error!("Invalid registry URL: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let client = match RubyGemsClient::new(
        registry_url.clone(),
        audit_config.timeout,
        audit_config.rate_limit,
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create registry client: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let auditor = match Auditor::new(client, &audit_config.author_pattern) {
        Ok(a) => a.with_console(console),
        Err(e) => {
            error!("{}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    console.print_info(&format!(
        "Checking {} dependencies against {}",
        manifest.dependencies.len(),
        registry_url
    ));

    let report = auditor.audit(&manifest.dependencies).await;
    console.print_audit_report(&report, registry_url.host_str().unwrap_or("the registry"));

    Ok(())
}

fn run_remotes(remotes_config: RemotesConfig, console: ConsoleOutput) -> Result<(), ExitCode> {
    let files = match collect_lock_files(&remotes_config.path) {
        Ok(f) => f,
        Err(e) => {
            error!("Error fetching lockfiles: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let inspector = Inspector::new(remotes_config.ecosystem.ecosystem(), console);
    let urls = inspector.list_remotes(&files, remotes_config.grep.as_deref());

    match write_remotes(&remotes_config.output_dir, &urls) {
        Ok(path) => {
            console.print_success(&format!(
                "{} remotes from {} lockfiles written to {}",
                urls.len(),
                files.len(),
                path.display()
            ));
            Ok(())
        }
        Err(e) => {
            error!("Error writing remotes: {}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

fn run_analyze(analyze_config: AnalyzeConfig, console: ConsoleOutput) -> Result<(), ExitCode> {
    let manifest = match Manifest::load(&analyze_config.registry) {
        Ok(m) => m,
        Err(e) => {
            error!("Error building registry: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let files = match collect_lock_files(&analyze_config.path) {
        Ok(f) => f,
        Err(e) => {
            error!("Error fetching lockfiles: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let inspector = Inspector::new(analyze_config.ecosystem.ecosystem(), console);
    let results = match inspector.analyze(&files, &manifest) {
        Ok(r) => r,
        Err(e) => {
            error!("Analysis failed: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    for (path, mismatches) in &results {
        console.print_mismatches(path, mismatches);
        if let Err(e) = write_mismatches(&analyze_config.output_dir, path, mismatches) {
            error!("Error writing file: {}", e);
            return Err(ExitCode::FAILURE);
        }
    }

    console.print_info(&format!(
        "{} of {} lockfiles resolve registry dependencies from other remotes",
        results.len(),
        files.len()
    ));

    Ok(())
}
