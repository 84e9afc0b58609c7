//! The Category → SubCategory → Product tree built by a crawl run
//!
//! - `Category` / `SubCategory` / `Product`: plain records
//! - `CrawlTree`: owns the categories plus the keyed tables that map a
//!   listing URL or a pagination prefix back to its subcategory node

mod tree;

pub use tree::{CrawlTree, NodeId};

use crate::state::ListingState;

/// A single product tile
///
/// Every field is copied verbatim from the page. A locator that finds
/// nothing yields an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Product {
    pub url: String,
    pub name: String,
    pub image_url: String,
    pub brand: String,
    pub quantity: String,
    pub price: String,
    pub price_unit: String,
    pub price_secondary: String,
    pub price_secondary_unit: String,
}

/// A leaf of the navigation menu with its own product listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCategory {
    pub name: String,
    listing_url: String,
    pagination_prefix: Option<String>,
    products: Vec<Product>,
    state: ListingState,
}

impl SubCategory {
    pub fn new(name: impl Into<String>, listing_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listing_url: listing_url.into(),
            pagination_prefix: None,
            products: Vec::new(),
            state: ListingState::Pending,
        }
    }

    /// Canonical absolute URL of the first listing page
    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// Prefix of this subcategory's "load more" URLs, once known
    pub fn pagination_prefix(&self) -> Option<&str> {
        self.pagination_prefix.as_deref()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn state(&self) -> ListingState {
        self.state
    }
}

/// A top-level navigation entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub subcategories: Vec<SubCategory>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subcategories: Vec::new(),
        }
    }
}
