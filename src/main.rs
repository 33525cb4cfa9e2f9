//! bds-harvest main entry point
//!
//! This is the command-line interface for the real-estate listing harvester.

use anyhow::{bail, Context};
use bds_harvest::config::{load_config_with_hash, RunConfig};
use bds_harvest::crawler::{Aggregator, RunReport};
use bds_harvest::fetch::FetchResolver;
use bds_harvest::output::{
    generate_markdown_report, print_statistics, write_json_report, RunStatistics,
};
use bds_harvest::search::GoogleSearch;
use bds_harvest::sites::Registry;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// bds-harvest: real-estate listing harvester
///
/// Turns a free-text query into structured listing records by searching,
/// following category pages, fetching detail pages and parsing them with
/// per-site extraction rules.
#[derive(Parser, Debug)]
#[command(name = "bds-harvest")]
#[command(version)]
#[command(about = "A real-estate listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Free-text query, e.g. "Bán nhà Quận 3"
    #[arg(value_name = "QUERY", required_unless_present = "dry_run")]
    query: Option<String>,

    /// Number of records to return (defaults to aggregate.target-total)
    #[arg(short, long)]
    target: Option<usize>,

    /// Write the run as JSON to this path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write a markdown report to this path
    #[arg(long, value_name = "PATH")]
    markdown: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without any network access
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let registry = Registry::with_defaults();

    if cli.dry_run {
        handle_dry_run(&config, &registry);
        return Ok(());
    }

    let Some(query) = cli.query.as_deref() else {
        bail!("a query is required unless --dry-run is given");
    };
    let target = cli.target.unwrap_or(config.aggregate.target_total);
    let batch_size = config.aggregate.first_batch_size.max(1);

    let report = handle_harvest(config, registry, query, target).await?;
    let stats = RunStatistics::from_report(&report);

    if !cli.quiet {
        print_records(&report, batch_size);
        print_statistics(&report, &stats);
    }

    if let Some(path) = &cli.json {
        write_json_report(&report, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("JSON written to {}", path.display());
    }
    if let Some(path) = &cli.markdown {
        generate_markdown_report(&report, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Markdown report written to {}", path.display());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bds_harvest=info,warn"),
            1 => EnvFilter::new("bds_harvest=debug,info"),
            2 => EnvFilter::new("bds_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration and parsers
fn handle_dry_run(config: &RunConfig, registry: &Registry) {
    println!("=== bds-harvest Dry Run ===\n");

    println!("Search:");
    println!("  Endpoint: {}", config.search.endpoint);
    println!("  Page size: {}", config.search.page_size);
    println!("  Max pages: {}", config.search.max_pages);
    println!(
        "  API key: {}",
        if config.search.api_key.is_empty() { "(missing)" } else { "set" }
    );

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!(
        "  Browser: {} (timeout {}s)",
        if config.fetch.browser_enabled { "enabled" } else { "disabled" },
        config.fetch.browser_timeout_secs
    );
    if let Some(strategy) = &config.fetch.force_strategy {
        println!("  Forced strategy: {}", strategy);
    }
    println!("  Sessions: {}", config.fetch.session.len());

    println!("\nAggregation:");
    println!("  Target total: {}", config.aggregate.target_total);
    println!("  First batch: {}", config.aggregate.first_batch_size);
    println!(
        "  Concurrency: {} workers, {} per domain",
        config.aggregate.max_concurrent_fetches, config.aggregate.per_domain_concurrency
    );
    println!("  Sublinks per listing: {}", config.aggregate.sublinks_per_listing);

    println!("\nQuotas ({}):", config.quota.len());
    for quota in &config.quota {
        println!("  - {}: {}", quota.domain, quota.count);
    }

    println!("\nRegistered Parsers ({}):", registry.len());
    for domain in registry.domains() {
        println!("  - {}", domain);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: RunConfig,
    registry: Registry,
    query: &str,
    target: usize,
) -> anyhow::Result<RunReport> {
    let provider = Arc::new(GoogleSearch::new(&config.search)?);
    let fetcher = Arc::new(FetchResolver::new(&config.fetch)?);
    let aggregator = Aggregator::new(config, provider, fetcher, registry);

    // Ctrl-C stops new work; records collected so far are still reported
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight fetches");
                token.cancel();
            }
        })
    };

    let result = aggregator.run_with_cancel(query, target, cancel).await;
    ctrl_c.abort();

    match result {
        Ok(report) => Ok(report),
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Prints records in display batches
fn print_records(report: &RunReport, batch_size: usize) {
    if report.is_no_results() {
        println!("No listings found for '{}'. Try a broader query.\n", report.query);
        return;
    }

    let mut shown = 0;
    let mut index = 0;
    while report.has_more(shown) {
        println!("--- Batch {} ---\n", index + 1);
        for record in report.batch(index, batch_size) {
            shown += 1;
            println!("{}. {}", shown, display_or(&record.title, "(untitled)"));
            println!("   Link: {}", record.link);
            println!("   Price: {}", display_or(&record.price, "-"));
            println!("   Area: {}", display_or(&record.area, "-"));
            if !record.contact.is_empty() {
                println!("   Contact: {}", record.contact);
            }
            println!("   Source: {}", record.source_tag);
            println!();
        }
        index += 1;
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
