//! Output module for exporting crawl results
//!
//! This module handles:
//! - Writing the collected tree to CSV
//! - Recording and printing run statistics

mod csv_export;
pub mod stats;

pub use csv_export::{export_csv, write_csv, ExportSummary, CSV_HEADER};
pub use stats::{print_statistics, CrawlStats, StateGroups};
