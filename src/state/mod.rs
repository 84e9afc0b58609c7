//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `ListingState`: how far the crawl of one subcategory got
//! - `RunContext`: the tree and statistics owned by a single crawl run

mod listing_state;
mod run_context;

pub use listing_state::ListingState;
pub use run_context::RunContext;
