use super::{Category, Product, SubCategory};
use crate::state::ListingState;
use std::collections::HashMap;

/// Handle of a subcategory inside a `CrawlTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub category: usize,
    pub subcategory: usize,
}

/// The run's category tree plus its correlation tables
///
/// The shape of the tree is fixed once built: later phases only append
/// products, set pagination prefixes and advance listing states.
#[derive(Debug, Clone, Default)]
pub struct CrawlTree {
    categories: Vec<Category>,
    by_listing_url: HashMap<String, NodeId>,
    by_pagination_prefix: HashMap<String, NodeId>,
}

impl CrawlTree {
    /// Builds the tree and indexes every subcategory by its listing URL
    ///
    /// Listing URLs are the correlation key, so a subcategory whose URL was
    /// already claimed by an earlier one is dropped.
    pub fn from_categories(categories: Vec<Category>) -> Self {
        let mut tree = Self::default();

        for mut category in categories {
            let category_idx = tree.categories.len();
            let mut kept = Vec::with_capacity(category.subcategories.len());

            for sub in std::mem::take(&mut category.subcategories) {
                if tree.by_listing_url.contains_key(&sub.listing_url) {
                    tracing::warn!(
                        "Dropping subcategory '{}' in '{}': listing URL {} already belongs to another subcategory",
                        sub.name,
                        category.name,
                        sub.listing_url
                    );
                    continue;
                }

                let node = NodeId {
                    category: category_idx,
                    subcategory: kept.len(),
                };
                tree.by_listing_url.insert(sub.listing_url.clone(), node);
                kept.push(sub);
            }

            category.subcategories = kept;
            tree.categories.push(category);
        }

        tree
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn into_categories(self) -> Vec<Category> {
        self.categories
    }

    /// Every subcategory node in tree order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.categories
            .iter()
            .enumerate()
            .flat_map(|(category, c)| {
                (0..c.subcategories.len()).map(move |subcategory| NodeId {
                    category,
                    subcategory,
                })
            })
    }

    pub fn subcategory(&self, node: NodeId) -> Option<&SubCategory> {
        self.categories
            .get(node.category)
            .and_then(|c| c.subcategories.get(node.subcategory))
    }

    fn subcategory_mut(&mut self, node: NodeId) -> Option<&mut SubCategory> {
        self.categories
            .get_mut(node.category)
            .and_then(|c| c.subcategories.get_mut(node.subcategory))
    }

    /// Finds the subcategory whose listing URL is exactly `url`
    pub fn find_by_listing_url(&self, url: &str) -> Option<NodeId> {
        self.by_listing_url.get(url).copied()
    }

    /// Finds the subcategory whose pagination prefix is exactly `prefix`
    pub fn find_by_pagination_prefix(&self, prefix: &str) -> Option<NodeId> {
        self.by_pagination_prefix.get(prefix).copied()
    }

    /// Appends products to a node, keeping document order
    pub fn append_products(&mut self, node: NodeId, products: Vec<Product>) {
        if let Some(sub) = self.subcategory_mut(node) {
            sub.products.extend(products);
        }
    }

    /// Records a node's pagination prefix
    ///
    /// Returns false without changing anything if the node already has a
    /// prefix or another node already owns this one.
    pub fn set_pagination_prefix(&mut self, node: NodeId, prefix: &str) -> bool {
        if let Some(owner) = self.by_pagination_prefix.get(prefix) {
            if *owner != node {
                tracing::warn!(
                    "Pagination prefix {} already belongs to another subcategory",
                    prefix
                );
            }
            return false;
        }

        let Some(sub) = self.subcategory_mut(node) else {
            return false;
        };

        if let Some(existing) = &sub.pagination_prefix {
            tracing::warn!(
                "Subcategory '{}' already has pagination prefix {}, ignoring {}",
                sub.name,
                existing,
                prefix
            );
            return false;
        }

        sub.pagination_prefix = Some(prefix.to_string());
        self.by_pagination_prefix.insert(prefix.to_string(), node);
        true
    }

    pub fn set_state(&mut self, node: NodeId, state: ListingState) {
        if let Some(sub) = self.subcategory_mut(node) {
            sub.state = state;
        }
    }

    pub fn product_count(&self, node: NodeId) -> usize {
        self.subcategory(node).map_or(0, |s| s.products.len())
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn subcategory_count(&self) -> usize {
        self.by_listing_url.len()
    }

    pub fn total_products(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.subcategories)
            .map(|s| s.products.len())
            .sum()
    }

    /// Number of subcategories in each listing state
    pub fn count_by_state(&self) -> HashMap<ListingState, usize> {
        let mut counts = HashMap::new();
        for sub in self.categories.iter().flat_map(|c| &c.subcategories) {
            *counts.entry(sub.state).or_insert(0) += 1;
        }
        counts
    }
}
