//! Aisle Crawler main entry point
//!
//! This is the command-line interface for the Aisle Crawler catalog mapper.

use aisle_crawler::config::{load_config_with_hash, Config};
use aisle_crawler::crawler::run_crawl;
use aisle_crawler::output::print_statistics;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Aisle Crawler: a retail catalog mapper
///
/// Aisle Crawler reads a shop's navigation menu, visits every subcategory
/// listing (following its "load more" pages) and writes one CSV row per
/// product.
#[derive(Parser, Debug)]
#[command(name = "aisle-crawler")]
#[command(version)]
#[command(about = "A retail catalog mapper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Write the CSV here instead of `output.csv-path`
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(output) = cli.output {
        config.output.csv_path = output.display().to_string();
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("aisle_crawler=info,warn"),
            1 => EnvFilter::new("aisle_crawler=debug,info"),
            2 => EnvFilter::new("aisle_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Aisle Crawler Dry Run ===\n");

    println!("Site:");
    println!("  Root URL: {}", config.site.root_url);
    println!("  Excluded category: {}", config.site.excluded_category);
    println!(
        "  Pagination: '{}' endpoints, offset '{}', size parameter '{}'",
        config.site.pagination_marker, config.site.offset_marker, config.site.page_size_param
    );

    println!("\nAllowed Domains ({}):", config.site.allowed_domains.len());
    if config.site.allowed_domains.is_empty() {
        println!("  (any host)");
    }
    for domain in &config.site.allowed_domains {
        println!("  - {}", domain);
    }

    println!(
        "\nDenied URL Patterns ({}):",
        config.site.denied_url_patterns.len()
    );
    for pattern in &config.site.denied_url_patterns {
        println!("  - {}", pattern);
    }

    println!("\nCrawler Configuration:");
    println!(
        "  Max concurrent listings: {}",
        config.crawler.max_concurrent_listings
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Retries: {} ({}ms apart)",
        config.crawler.max_retries, config.crawler.retry_delay
    );
    println!(
        "  Minimum request interval: {}ms",
        config.crawler.minimum_request_interval
    );
    println!("  Follow pagination: {}", config.crawler.follow_pagination);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling from {}", config.site.root_url);
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} into {}",
        config.site.root_url,
        config.output.csv_path
    );

    let csv_path = config.output.csv_path.clone();
    let context = run_crawl(config)
        .await
        .map_err(|e| {
            tracing::error!("Crawl failed: {}", e);
            e
        })
        .with_context(|| format!("crawl aborted, {} not written", csv_path))?;

    tracing::info!("Crawl completed successfully");

    if !quiet {
        print_statistics(&context.stats, &context.tree);
    }

    Ok(())
}
