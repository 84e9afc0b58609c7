//! Run statistics
//!
//! Counters accumulated while a run progresses, plus the summary printed
//! once the CSV has been written.

use crate::catalog::CrawlTree;
use crate::state::ListingState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Categories kept after discovery
    pub categories: usize,

    /// Subcategories kept after discovery
    pub subcategories: usize,

    /// Products collected across the tree
    pub products: usize,

    /// Listing pages fetched successfully
    pub listing_fetches: usize,

    /// "Load more" pages fetched successfully
    pub pagination_fetches: usize,

    /// Fetches that failed after retries
    pub failed_fetches: usize,

    /// URLs refused by the allow/deny configuration
    pub filtered: usize,

    /// Responses no subcategory claimed
    pub unmatched: usize,

    /// Listing pages whose results counter could not be read
    pub counters_unparsed: usize,

    /// CSV rows written
    pub rows_written: usize,

    /// CSV rows that failed to serialize
    pub rows_failed: usize,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlStats {
    /// Fresh counters stamped with the current time
    pub fn start() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Run duration in seconds, once both timestamps are set
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some((finished - started).num_seconds()),
            _ => None,
        }
    }
}

/// Subcategory counts folded over the listing state predicates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateGroups {
    pub with_products_page: usize,
    pub errors: usize,
    pub unfinished: usize,
}

impl StateGroups {
    pub fn from_counts(by_state: &HashMap<ListingState, usize>) -> Self {
        let mut groups = Self::default();
        for (state, count) in by_state {
            if state.has_products_page() {
                groups.with_products_page += count;
            }
            if state.is_error() {
                groups.errors += count;
            }
            if !state.is_terminal() {
                groups.unfinished += count;
            }
        }
        groups
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The run counters
/// * `tree` - The final tree, used for per-state subcategory counts
pub fn print_statistics(stats: &CrawlStats, tree: &CrawlTree) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    if let Some(started) = stats.started_at {
        println!("  Started: {}", started.to_rfc3339());
    }
    if let Some(duration) = stats.duration_seconds() {
        println!(
            "  Duration: {} seconds ({:.2} minutes)",
            duration,
            duration as f64 / 60.0
        );
    }
    println!("  Categories: {}", stats.categories);
    println!("  Subcategories: {}", stats.subcategories);
    println!("  Products: {}", stats.products);
    println!();

    println!("Requests:");
    println!("  Listing pages: {}", stats.listing_fetches);
    println!("  Pagination pages: {}", stats.pagination_fetches);
    println!("  Failed: {}", stats.failed_fetches);
    println!("  Filtered: {}", stats.filtered);
    println!("  Unmatched responses: {}", stats.unmatched);
    println!("  Unparsed counters: {}", stats.counters_unparsed);
    println!();

    println!("Subcategories by State:");
    let by_state = tree.count_by_state();
    let mut state_counts: Vec<_> = ListingState::all_states()
        .into_iter()
        .filter_map(|state| by_state.get(&state).map(|count| (state, *count)))
        .collect();
    state_counts.sort_by(|a, b| b.1.cmp(&a.1));

    for (state, count) in state_counts {
        let percentage = if stats.subcategories > 0 {
            (count as f64 / stats.subcategories as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }

    let groups = StateGroups::from_counts(&by_state);
    println!("  -- with a products page: {}", groups.with_products_page);
    println!("  -- errors: {}", groups.errors);
    if groups.unfinished > 0 {
        println!("  -- unfinished: {}", groups.unfinished);
    }
    println!();

    println!("Export:");
    println!("  Rows written: {}", stats.rows_written);
    if stats.rows_failed > 0 {
        println!("  Rows failed: {}", stats.rows_failed);
    }

    let complete = by_state.get(&ListingState::Complete).copied().unwrap_or(0);
    let completion_rate = if stats.subcategories > 0 {
        (complete as f64 / stats.subcategories as f64) * 100.0
    } else {
        0.0
    };

    println!();
    println!(
        "Completion Rate: {:.1}% ({} / {} subcategories fully collected)",
        completion_rate, complete, stats.subcategories
    );
}
