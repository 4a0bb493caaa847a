//! Site-Import main entry point
//!
//! This is the command-line interface for importing an external HTML site
//! into the content repository.

use anyhow::{bail, Context};
use clap::Parser;
use site_import::config::{load_config_with_hash, Config};
use site_import::output::{print_site_statistics, print_summary, write_import_report};
use site_import::repository::SqliteRepository;
use site_import::{ImportRequest, SiteImporter};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site-Import: turn an external HTML site into managed content
///
/// Site-Import crawls a seed page and everything it links to on the same
/// site, catalogs the pages, downloads images and stylesheets, and commits
/// the result as a site with a template, a theme and pages.
#[derive(Parser, Debug)]
#[command(name = "site-import")]
#[command(version = "1.0.0")]
#[command(about = "Import an external HTML site into the content repository", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URL of the page the import starts from
    #[arg(value_name = "SEED_URL", required_unless_present_any = ["dry_run", "stats"])]
    seed_url: Option<String>,

    /// Name of the site to create
    #[arg(long = "site", value_name = "NAME", required_unless_present_any = ["dry_run", "stats"])]
    site: Option<String>,

    /// User the import runs as
    #[arg(long, default_value = "importer")]
    user: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be imported without importing
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show stored statistics from the repository and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => (cfg, hash),
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.seed_url.as_deref(), cli.site.as_deref());
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let request = ImportRequest {
            seed_url: cli.seed_url.unwrap_or_default(),
            site_name: cli.site.unwrap_or_default(),
            user: cli.user,
        };
        handle_import(config, request).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_import=info,warn"),
            1 => EnvFilter::new("site_import=debug,info"),
            2 => EnvFilter::new("site_import=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be imported
fn handle_dry_run(config: &Config, seed_url: Option<&str>, site: Option<&str>) {
    println!("=== Site-Import Dry Run ===\n");

    println!("Importer Configuration:");
    println!("  Max depth: {}", config.importer.max_depth);
    println!("  Follow redirects: {}", config.importer.follow_redirects);
    println!("  Synchronous commits: {}", config.importer.synchronous_commits);
    println!("  Max commit workers: {}", config.importer.max_commit_workers);
    println!(
        "  Commit drain timeout: {}ms",
        config.importer.commit_drain_timeout_ms
    );
    println!("  Request timeout: {}s", config.importer.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");
    if let (Some(seed_url), Some(site)) = (seed_url, site) {
        println!("✓ Would import {} as site {}", seed_url, site);
    }
}

/// Handles the --stats mode: shows stored statistics from the repository
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let repository = SqliteRepository::new(Path::new(&config.output.database_path))
        .with_context(|| format!("opening {}", config.output.database_path))?;
    print_site_statistics(&repository)?;

    Ok(())
}

/// Handles the main import operation
async fn handle_import(
    config: Config,
    request: ImportRequest,
) -> anyhow::Result<()> {
    let summary_path = PathBuf::from(&config.output.summary_path);
    let importer = SiteImporter::new(config)?;

    let cancel = importer.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let running = cancel.cancel();
            tracing::warn!(
                "Interrupt received, stopping {} running import(s) after the current step",
                running
            );
        }
    });

    let summary = match importer.import(request).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Import failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&summary);
    write_import_report(&summary, &summary_path)
        .with_context(|| format!("writing report to {}", summary_path.display()))?;
    println!("✓ Report written to: {}", summary_path.display());

    if !summary.outcome.is_completed() {
        bail!("import {}", summary.outcome);
    }

    Ok(())
}
