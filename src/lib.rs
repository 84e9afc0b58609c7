//! Aisle Crawler: a retail catalog mapper
//!
//! This crate crawls a retail site's navigation menu, follows every
//! subcategory listing (including its "load more" pages) and writes the
//! resulting Category → SubCategory → Product tree to a CSV file.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl runs
///
/// Every variant that reaches the top of a run is fatal. Recoverable
/// per-URL problems never leave the coordinator.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Discovery page {url} could not be fetched: {source}")]
    Discovery {
        url: String,
        source: crawler::FetchError,
    },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid deny pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid CSS selector for {name}: {message}")]
    InvalidSelector { name: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Pagination URL has no offset marker '{marker}': {url}")]
    MissingOffsetMarker { url: String, marker: String },

    #[error("Pagination URL repeats offset marker '{marker}' {count} times: {url}")]
    RepeatedOffsetMarker {
        url: String,
        marker: String,
        count: usize,
    },
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use catalog::{Category, CrawlTree, NodeId, Product, SubCategory};
pub use config::Config;
pub use state::{ListingState, RunContext};
pub use url::{reduce_prefix, PaginationMarkers, UrlFilter};
