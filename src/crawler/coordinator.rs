//! Crawler coordinator - main crawl orchestration logic
//!
//! A run goes through two phases:
//! - Discovery: the root page is fetched once and its navigation menu
//!   becomes the category tree. Failure here aborts the run.
//! - Listing: every subcategory's listing page is fetched, correlated, and
//!   followed by its "load more" pages. Up to `max-concurrent-listings`
//!   subcategories are in flight; each one's pages are fetched in order.

use crate::catalog::{Category, CrawlTree, NodeId};
use crate::config::Config;
use crate::crawler::correlator::{Continuation, Correlation, Correlator};
use crate::crawler::extract::{extract_categories, Selectors};
use crate::crawler::{FetchError, Fetcher, Page};
use crate::state::{ListingState, RunContext};
use crate::url::PaginationMarkers;
use crate::CrawlError;
use futures::stream::{self, StreamExt};
use scraper::Html;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator<F: Fetcher> {
    config: Arc<Config>,
    fetcher: F,
    correlator: Correlator,
}

impl<F: Fetcher> Coordinator<F> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawler configuration
    /// * `fetcher` - Where every page request goes
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - A selector failed to compile
    pub fn new(config: Config, fetcher: F) -> Result<Self, CrawlError> {
        let selectors = Selectors::compile(&config.selectors)?;
        let markers = PaginationMarkers::from_config(&config.site);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            correlator: Correlator::new(markers, selectors),
        })
    }

    /// Runs discovery then every listing job
    ///
    /// Per-URL failures are logged and recorded on the subcategory. A fatal
    /// error drops the job stream, cancelling whatever is still in flight.
    pub async fn run(&self) -> Result<RunContext, CrawlError> {
        let categories = self.discover().await?;
        let tree = CrawlTree::from_categories(categories);

        tracing::info!(
            "Discovered {} categories with {} subcategories",
            tree.category_count(),
            tree.subcategory_count()
        );

        let jobs: Vec<(NodeId, String)> = tree
            .nodes()
            .filter_map(|node| {
                tree.subcategory(node)
                    .map(|sub| (node, sub.listing_url().to_string()))
            })
            .collect();

        let context = Mutex::new(RunContext::new(tree));

        let mut results = stream::iter(jobs)
            .map(|(node, url)| self.crawl_subcategory(&context, node, url))
            .buffer_unordered(self.config.crawler.max_concurrent_listings as usize);

        while let Some(result) = results.next().await {
            result?;
        }
        drop(results);

        let mut context = context.into_inner().unwrap_or_else(PoisonError::into_inner);
        context.stats.products = context.tree.total_products();

        tracing::info!(
            "Crawl completed: {} products from {} subcategories",
            context.stats.products,
            context.stats.subcategories
        );

        Ok(context)
    }

    /// Fetches the root page and extracts the category tree
    async fn discover(&self) -> Result<Vec<Category>, CrawlError> {
        let root = Url::parse(&self.config.site.root_url)?;

        let page = self
            .fetcher
            .fetch(&root)
            .await
            .map_err(|source| CrawlError::Discovery {
                url: root.to_string(),
                source,
            })?;

        Ok(self.extract_tree(&page))
    }

    fn extract_tree(&self, page: &Page) -> Vec<Category> {
        let document = Html::parse_document(&page.body);
        extract_categories(
            &document,
            &page.url,
            self.correlator.selectors(),
            &self.config.site.excluded_category,
        )
    }

    /// Fetches one subcategory's listing page and, if it declares more
    /// results, its continuation pages
    async fn crawl_subcategory(
        &self,
        context: &Mutex<RunContext>,
        node: NodeId,
        listing_url: String,
    ) -> Result<(), CrawlError> {
        let url = Url::parse(&listing_url)?;

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                self.record_fetch_failure(context, Some(node), &e);
                return Ok(());
            }
        };

        let continuation = match self.correlate(context, &page)? {
            Correlation::Listing { continuation, .. } => continuation,
            _ => None,
        };

        let Some(continuation) = continuation else {
            return Ok(());
        };

        if self.config.crawler.follow_pagination {
            self.paginate(context, node, &continuation).await?;
        } else {
            tracing::debug!(
                "Pagination disabled, keeping first page of {}",
                listing_url
            );
        }

        let mut ctx = lock(context);
        let collected = ctx.tree.product_count(node);
        let state = if collected >= continuation.total {
            ListingState::Complete
        } else {
            ListingState::Partial
        };
        tracing::debug!(
            "{}: {} of {} products collected",
            listing_url,
            collected,
            continuation.total
        );
        ctx.tree.set_state(node, state);

        Ok(())
    }

    /// Fetches "load more" pages in offset order until the offsets run out
    /// or the node holds the declared total
    async fn paginate(
        &self,
        context: &Mutex<RunContext>,
        node: NodeId,
        continuation: &Continuation,
    ) -> Result<(), CrawlError> {
        for page_url in continuation.page_urls(self.correlator.markers()) {
            if lock(context).tree.product_count(node) >= continuation.total {
                tracing::debug!("Reached declared total for {}", continuation.prefix);
                break;
            }

            let url = Url::parse(&page_url)?;
            let page = match self.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    self.record_fetch_failure(context, None, &e);
                    continue;
                }
            };

            match self.correlate(context, &page)? {
                Correlation::Pagination { added: 0, .. } => {
                    tracing::debug!("No products on {}", page_url);
                }
                Correlation::Pagination { .. } => {}
                _ => break,
            }
        }

        Ok(())
    }

    /// Correlates a page under the run lock and updates counters
    fn correlate(
        &self,
        context: &Mutex<RunContext>,
        page: &Page,
    ) -> Result<Correlation, CrawlError> {
        let mut guard = lock(context);
        let ctx = &mut *guard;
        let correlation = self.correlator.correlate(&mut ctx.tree, page)?;

        match &correlation {
            Correlation::Unmatched { .. } => ctx.stats.unmatched += 1,
            Correlation::Pagination { .. } => ctx.stats.pagination_fetches += 1,
            Correlation::Listing {
                node, continuation, ..
            } => {
                ctx.stats.listing_fetches += 1;
                if continuation.is_none()
                    && ctx.tree.subcategory(*node).map(|s| s.state())
                        == Some(ListingState::CounterUnparsed)
                {
                    ctx.stats.counters_unparsed += 1;
                }
            }
        }

        Ok(correlation)
    }

    /// Logs a per-URL failure; for listing pages the subcategory records it too
    fn record_fetch_failure(
        &self,
        context: &Mutex<RunContext>,
        node: Option<NodeId>,
        error: &FetchError,
    ) {
        let mut ctx = lock(context);

        let state = match error {
            FetchError::Filtered { .. } => {
                tracing::debug!("{}", error);
                ctx.stats.filtered += 1;
                ListingState::Filtered
            }
            _ => {
                tracing::warn!("{}", error);
                ctx.stats.failed_fetches += 1;
                ListingState::FetchFailed
            }
        };

        if let Some(node) = node {
            ctx.tree.set_state(node, state);
        }
    }
}

fn lock(context: &Mutex<RunContext>) -> MutexGuard<'_, RunContext> {
    context.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::output::write_csv;
    use crate::UrlError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    const ROOT: &str = "https://shop.pt/";
    const ROLLS: &str = "https://shop.pt/bread/rolls/";
    const LOAVES: &str = "https://shop.pt/bread/loaves/";
    const GRID: &str = "https://shop.pt/on/demandware.store/Sites-shop/default/Search-UpdateGrid?cgid=rolls";

    /// Serves canned bodies and remembers every request
    #[derive(Default)]
    struct MockFetcher {
        pages: HashMap<String, Result<String, FetchError>>,
        requested: std::sync::Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn page(mut self, url: &str, body: String) -> Self {
            self.pages.insert(url.to_string(), Ok(body));
            self
        }

        fn failure(mut self, url: &str, error: FetchError) -> Self {
            self.pages.insert(url.to_string(), Err(error));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(Ok(body)) => Ok(Page::new(url.clone(), body.clone())),
                Some(Err(e)) => Err(e.clone()),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status_code: 404,
                }),
            }
        }
    }

    fn config(crawler: &str) -> Config {
        parse_config(&format!(
            r#"
[site]
root-url = "{ROOT}"

[crawler]
{crawler}

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
csv-path = "data.csv"
"#
        ))
        .unwrap()
    }

    fn menu(subcategories: &[(&str, &str)]) -> String {
        let links: String = subcategories
            .iter()
            .map(|(name, url)| format!(r#"<li><a href="{}">{}</a></li>"#, url, name))
            .collect();
        format!(
            r#"<html><body><div class="container-dropdown-first-column">
                 <div class="dropdown-item"><span class="category-info">Destaques</span>
                   <ul><li><a href="/promo/">Promo</a></li></ul></div>
                 <div class="dropdown-item"><span class="category-info"> Bread </span>
                   <ul>{}</ul></div>
               </div></body></html>"#,
            links
        )
    }

    fn tiles(names: &[&str]) -> String {
        names
            .iter()
            .map(|n| {
                format!(
                    r#"<div class="productTile"><div class="ct-pdp-link"><a href="/p/{0}">{0}</a></div></div>"#,
                    n
                )
            })
            .collect()
    }

    fn listing(names: &[&str], counter: &str, more: &str) -> String {
        format!(
            r#"<html><body>{}<div class="search-results-products-counter">{}</div>
               <div class="search-view-more-products-btn-wrapper" data-url="{}"></div></body></html>"#,
            tiles(names),
            counter,
            more
        )
    }

    fn grid_page(offset: usize, size: usize) -> String {
        format!("{}&start={}&sz={}", GRID, offset, size)
    }

    fn names(context: &RunContext, url: &str) -> Vec<String> {
        let node = context.tree.find_by_listing_url(url).unwrap();
        context
            .tree
            .subcategory(node)
            .unwrap()
            .products()
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    fn state(context: &RunContext, url: &str) -> ListingState {
        let node = context.tree.find_by_listing_url(url).unwrap();
        context.tree.subcategory(node).unwrap().state()
    }

    #[tokio::test]
    async fn test_single_page_subcategory_end_to_end() {
        let fetcher = MockFetcher::default()
            .page(ROOT, menu(&[("Rolls", "/bread/rolls/")]))
            .page(ROLLS, listing(&["r1", "r2"], "2 of 2 results", &grid_page(2, 2)));
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(context.tree.category_count(), 1);
        assert_eq!(names(&context, ROLLS), vec!["r1", "r2"]);
        let node = context.tree.find_by_listing_url(ROLLS).unwrap();
        assert_eq!(context.tree.subcategory(node).unwrap().pagination_prefix(), Some(GRID));
        assert_eq!(state(&context, ROLLS), ListingState::Complete);
        assert_eq!(coordinator.fetcher.requested(), vec![ROOT, ROLLS]);

        let mut buffer = Vec::new();
        let summary = write_csv(context.tree.categories(), &mut buffer).unwrap();
        assert_eq!(summary.rows_written, 2);
        let text = String::from_utf8(buffer).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|row| row.starts_with(&format!("Bread,Rolls,{}", ROLLS))));
    }

    #[tokio::test]
    async fn test_continuation_collects_declared_total() {
        let fetcher = MockFetcher::default()
            .page(ROOT, menu(&[("Rolls", "/bread/rolls/")]))
            .page(ROLLS, listing(&["r1", "r2"], "2 of 5 results", &grid_page(2, 2)))
            .page(&grid_page(2, 2), tiles(&["r3", "r4"]))
            .page(&grid_page(4, 2), tiles(&["r5"]));
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(names(&context, ROLLS), vec!["r1", "r2", "r3", "r4", "r5"]);
        assert_eq!(state(&context, ROLLS), ListingState::Complete);
        assert_eq!(context.stats.listing_fetches, 1);
        assert_eq!(context.stats.pagination_fetches, 2);
        assert_eq!(context.stats.products, 5);
    }

    #[tokio::test]
    async fn test_first_page_only_when_pagination_disabled() {
        // Collecting only the first page leaves the subcategory short of
        // its declared total; the continuation loop above is what fixes it
        let fetcher = MockFetcher::default()
            .page(ROOT, menu(&[("Rolls", "/bread/rolls/")]))
            .page(ROLLS, listing(&["r1", "r2"], "2 of 5 results", &grid_page(2, 2)))
            .page(&grid_page(2, 2), tiles(&["r3", "r4"]));
        let coordinator =
            Coordinator::new(config("follow-pagination = false"), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(names(&context, ROLLS), vec!["r1", "r2"]);
        assert_eq!(state(&context, ROLLS), ListingState::Partial);
        assert_eq!(coordinator.fetcher.requested(), vec![ROOT, ROLLS]);
    }

    #[tokio::test]
    async fn test_empty_pagination_page_moves_to_next_offset() {
        let fetcher = MockFetcher::default()
            .page(ROOT, menu(&[("Rolls", "/bread/rolls/")]))
            .page(ROLLS, listing(&["r1", "r2"], "2 of 6 results", &grid_page(2, 2)))
            .page(&grid_page(2, 2), "<html><body></body></html>".to_string())
            .page(&grid_page(4, 2), tiles(&["r5", "r6"]));
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(names(&context, ROLLS), vec!["r1", "r2", "r5", "r6"]);
        assert_eq!(state(&context, ROLLS), ListingState::Partial);
        assert!(coordinator.fetcher.requested().contains(&grid_page(4, 2)));
        assert_eq!(context.stats.pagination_fetches, 2);
    }

    #[tokio::test]
    async fn test_failed_pagination_page_moves_to_next_offset() {
        let fetcher = MockFetcher::default()
            .page(ROOT, menu(&[("Rolls", "/bread/rolls/")]))
            .page(ROLLS, listing(&["r1", "r2"], "2 of 6 results", &grid_page(2, 2)))
            .failure(
                &grid_page(2, 2),
                FetchError::Timeout {
                    url: grid_page(2, 2),
                },
            )
            .page(&grid_page(4, 2), tiles(&["r5", "r6"]));
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(names(&context, ROLLS), vec!["r1", "r2", "r5", "r6"]);
        assert_eq!(state(&context, ROLLS), ListingState::Partial);
        assert_eq!(context.stats.failed_fetches, 1);
    }

    #[tokio::test]
    async fn test_failing_listing_does_not_stop_siblings() {
        let fetcher = MockFetcher::default()
            .page(
                ROOT,
                menu(&[("Rolls", "/bread/rolls/"), ("Loaves", "/bread/loaves/")]),
            )
            .failure(
                ROLLS,
                FetchError::Status {
                    url: ROLLS.to_string(),
                    status_code: 500,
                },
            )
            .page(LOAVES, listing(&["l1"], "1 of 1 results", &grid_page(1, 1)));
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(state(&context, ROLLS), ListingState::FetchFailed);
        assert!(names(&context, ROLLS).is_empty());
        assert_eq!(names(&context, LOAVES), vec!["l1"]);
        assert_eq!(state(&context, LOAVES), ListingState::Complete);
        assert_eq!(context.stats.failed_fetches, 1);
    }

    #[tokio::test]
    async fn test_filtered_listing_is_recorded() {
        let fetcher = MockFetcher::default()
            .page(ROOT, menu(&[("Rolls", "/bread/rolls/")]))
            .failure(
                ROLLS,
                FetchError::Filtered {
                    url: ROLLS.to_string(),
                },
            );
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(state(&context, ROLLS), ListingState::Filtered);
        assert_eq!(context.stats.filtered, 1);
        assert_eq!(context.stats.failed_fetches, 0);
    }

    #[tokio::test]
    async fn test_unparsable_counter_skips_pagination() {
        let fetcher = MockFetcher::default()
            .page(ROOT, menu(&[("Rolls", "/bread/rolls/")]))
            .page(ROLLS, listing(&["r1"], "many results", &grid_page(1, 1)));
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(names(&context, ROLLS), vec!["r1"]);
        assert_eq!(state(&context, ROLLS), ListingState::CounterUnparsed);
        assert_eq!(context.stats.counters_unparsed, 1);
        assert_eq!(coordinator.fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_discovery_failure_is_fatal() {
        let fetcher = MockFetcher::default().failure(
            ROOT,
            FetchError::Network {
                url: ROOT.to_string(),
                message: "Connection refused".to_string(),
            },
        );
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let result = coordinator.run().await;

        assert!(matches!(result, Err(CrawlError::Discovery { .. })));
    }

    #[tokio::test]
    async fn test_malformed_load_more_url_is_fatal() {
        let fetcher = MockFetcher::default()
            .page(ROOT, menu(&[("Rolls", "/bread/rolls/")]))
            .page(ROLLS, listing(&["r1"], "1 of 3 results", GRID));
        let coordinator = Coordinator::new(config(""), fetcher).unwrap();

        let result = coordinator.run().await;

        assert!(matches!(
            result,
            Err(CrawlError::UrlError(UrlError::MissingOffsetMarker { .. }))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_listings_stay_separate() {
        let loaves_grid = "https://shop.pt/on/demandware.store/Sites-shop/default/Search-UpdateGrid?cgid=loaves";
        let fetcher = MockFetcher::default()
            .page(
                ROOT,
                menu(&[("Rolls", "/bread/rolls/"), ("Loaves", "/bread/loaves/")]),
            )
            .page(ROLLS, listing(&["r1"], "1 of 2 results", &grid_page(1, 1)))
            .page(&grid_page(1, 1), tiles(&["r2"]))
            .page(
                LOAVES,
                listing(&["l1"], "1 of 2 results", &format!("{}&start=1&sz=1", loaves_grid)),
            )
            .page(&format!("{}&start=1&sz=1", loaves_grid), tiles(&["l2"]));
        let coordinator =
            Coordinator::new(config("max-concurrent-listings = 4"), fetcher).unwrap();

        let context = coordinator.run().await.unwrap();

        assert_eq!(names(&context, ROLLS), vec!["r1", "r2"]);
        assert_eq!(names(&context, LOAVES), vec!["l1", "l2"]);
        assert_eq!(context.tree.count_by_state().get(&ListingState::Complete), Some(&2));
    }
}
