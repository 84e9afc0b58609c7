//! URL handling module for Aisle Crawler
//!
//! This module provides the fetch allow/deny filter and the pagination URL
//! helpers the correlator keys on.

mod filter;
mod pagination;

pub use filter::{matches_wildcard, UrlFilter};
pub use pagination::{reduce_prefix, PaginationMarkers, ResponseKind};
