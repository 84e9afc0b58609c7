//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with filtering, throttling and retries
//! - Category and product extraction from HTML
//! - Correlation of responses with the subcategory that asked for them
//! - Overall crawl coordination

mod coordinator;
mod correlator;
mod extract;
mod fetcher;

pub use coordinator::Coordinator;
pub use correlator::{Continuation, Correlation, Correlator, CounterError, ResultsCounter};
pub use extract::{
    extract_categories, extract_load_more_url, extract_products, extract_results_counter,
    Selectors,
};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher, Page};

use crate::config::Config;
use crate::output::export_csv;
use crate::state::RunContext;
use crate::CrawlError;
use std::path::PathBuf;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher
/// 2. Discover the category tree from the root page
/// 3. Fetch every subcategory listing and its pagination pages
/// 4. Write the collected products to `output.csv-path`
///
/// # Returns
///
/// * `Ok(RunContext)` - The final tree and run statistics
/// * `Err(CrawlError)` - A fatal error aborted the run
///
/// # Example
///
/// ```no_run
/// use aisle_crawler::config::load_config;
/// use aisle_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let context = run_crawl(config).await?;
/// println!("{} products", context.stats.products);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<RunContext, CrawlError> {
    let fetcher = HttpFetcher::from_config(&config)?;
    let csv_path = PathBuf::from(&config.output.csv_path);

    let coordinator = Coordinator::new(config, fetcher)?;
    let mut context = coordinator.run().await?;

    let summary = export_csv(context.tree.categories(), &csv_path)?;
    context.stats.rows_written = summary.rows_written;
    context.stats.rows_failed = summary.rows_failed;
    context.stats.finish();

    Ok(context)
}
