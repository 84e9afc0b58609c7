//! Response correlation
//!
//! Every fetched document, whether it came from a subcategory's listing URL
//! or from the "load more" endpoint, is routed back to the subcategory that
//! asked for it:
//!
//! - Listing responses are keyed on the exact listing URL.
//! - Pagination responses carry no back-reference; their URL is reduced to
//!   its pagination prefix, which was recorded on the subcategory when its
//!   listing page was processed.
//!
//! The first listing page also declares how many results exist in total,
//! which becomes the `Continuation` driving further page fetches.

use crate::catalog::{CrawlTree, NodeId};
use crate::crawler::extract::{
    extract_load_more_url, extract_products, extract_results_counter, Selectors,
};
use crate::crawler::Page;
use crate::state::ListingState;
use crate::url::{PaginationMarkers, ResponseKind};
use crate::CrawlError;
use scraper::Html;
use thiserror::Error;

/// Parsed "<pageSize> of <total> results" counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsCounter {
    pub page_size: usize,
    pub total: usize,
}

/// Why a results counter could not be read
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CounterError {
    #[error("expected at least 3 tokens in '{0}'")]
    TooFewTokens(String),

    #[error("'{token}' is not a count in '{text}'")]
    NotNumeric { token: String, text: String },

    #[error("page size is zero in '{0}'")]
    ZeroPageSize(String),
}

impl ResultsCounter {
    /// Parses counter text; only the first and third tokens matter, so any
    /// locale wording ("24 of 120 results", "24 de 120 resultados") works
    ///
    /// ```
    /// use aisle_crawler::crawler::ResultsCounter;
    ///
    /// let counter = ResultsCounter::parse("24 of 120 results").unwrap();
    /// assert_eq!((counter.page_size, counter.total), (24, 120));
    /// assert!(ResultsCounter::parse("garbage").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, CounterError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(CounterError::TooFewTokens(text.to_string()));
        }

        let count = |token: &str| {
            token.parse::<usize>().map_err(|_| CounterError::NotNumeric {
                token: token.to_string(),
                text: text.to_string(),
            })
        };

        let page_size = count(tokens[0])?;
        let total = count(tokens[2])?;

        if page_size == 0 {
            return Err(CounterError::ZeroPageSize(text.to_string()));
        }

        Ok(Self { page_size, total })
    }
}

/// Follow-up pages a listing response declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    /// Pagination prefix recorded on the subcategory
    pub prefix: String,
    pub page_size: usize,
    /// Declared total number of results
    pub total: usize,
}

impl Continuation {
    /// Page offsets after the first page, strictly below the total
    pub fn offsets(&self) -> impl Iterator<Item = usize> {
        (self.page_size..self.total).step_by(self.page_size.max(1))
    }

    /// URLs of every follow-up page, in offset order
    pub fn page_urls<'a>(
        &'a self,
        markers: &'a PaginationMarkers,
    ) -> impl Iterator<Item = String> + 'a {
        self.offsets()
            .map(move |offset| markers.page_url(&self.prefix, offset, self.page_size))
    }
}

/// Outcome of routing one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// No subcategory owns the response; nothing was changed
    Unmatched { url: String },

    /// Products of a "load more" page were appended to `node`
    Pagination { node: NodeId, added: usize },

    /// Products of a first listing page were appended to `node`
    Listing {
        node: NodeId,
        added: usize,
        /// Present when the counter was readable and the prefix recorded
        continuation: Option<Continuation>,
    },
}

/// Routes responses to their subcategory and extracts their products
#[derive(Debug, Clone)]
pub struct Correlator {
    markers: PaginationMarkers,
    selectors: Selectors,
}

impl Correlator {
    pub fn new(markers: PaginationMarkers, selectors: Selectors) -> Self {
        Self { markers, selectors }
    }

    pub fn markers(&self) -> &PaginationMarkers {
        &self.markers
    }

    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    /// Correlates `page` with its subcategory in `tree`
    ///
    /// # Returns
    ///
    /// * `Ok(Correlation)` - The response was routed (or found to be unmatched)
    /// * `Err(CrawlError)` - A pagination URL had no usable offset marker;
    ///   this is fatal for the run
    pub fn correlate(
        &self,
        tree: &mut CrawlTree,
        page: &Page,
    ) -> Result<Correlation, CrawlError> {
        let url = page.url.as_str();
        let kind = ResponseKind::of(url, &self.markers);

        let node = match kind {
            ResponseKind::Listing => tree.find_by_listing_url(url),
            ResponseKind::Pagination => {
                let prefix = self.markers.reduce(url)?;
                tree.find_by_pagination_prefix(prefix)
            }
        };

        let Some(node) = node else {
            tracing::warn!("Couldn't find subcategory for response from {}", url);
            return Ok(Correlation::Unmatched {
                url: url.to_string(),
            });
        };

        let document = Html::parse_document(&page.body);
        let products = extract_products(&document, &self.selectors);
        let added = products.len();
        tree.append_products(node, products);

        if kind == ResponseKind::Pagination {
            // "Load more" payloads carry no results counter
            return Ok(Correlation::Pagination { node, added });
        }

        let counter_text = extract_results_counter(&document, &self.selectors);
        let counter = match ResultsCounter::parse(&counter_text) {
            Ok(counter) => counter,
            Err(e) => {
                tracing::warn!("Couldn't parse results counter on {}: {}", url, e);
                tree.set_state(node, ListingState::CounterUnparsed);
                return Ok(Correlation::Listing {
                    node,
                    added,
                    continuation: None,
                });
            }
        };

        let raw_more = extract_load_more_url(&document, &self.selectors).unwrap_or_default();
        let more_url = if raw_more.is_empty() {
            raw_more
        } else {
            page.url.join(&raw_more)?.to_string()
        };
        let prefix = self.markers.reduce(&more_url)?.to_string();

        tree.set_pagination_prefix(node, &prefix);
        if tree.find_by_pagination_prefix(&prefix) != Some(node) {
            // Pages under this prefix would be routed elsewhere
            let state = if tree.product_count(node) >= counter.total {
                ListingState::Complete
            } else {
                ListingState::Partial
            };
            tree.set_state(node, state);
            return Ok(Correlation::Listing {
                node,
                added,
                continuation: None,
            });
        }
        tree.set_state(node, ListingState::Listed);

        tracing::debug!(
            "{}: {} of {} results on first page, pagination prefix {}",
            url,
            counter.page_size,
            counter.total,
            prefix
        );

        Ok(Correlation::Listing {
            node,
            added,
            continuation: Some(Continuation {
                prefix,
                page_size: counter.page_size,
                total: counter.total,
            }),
        })
    }
}
