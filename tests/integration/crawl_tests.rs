//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the shop and drive the real
//! HTTP fetcher through a full run, then read the produced CSV back.

use aisle_crawler::config::{parse_config, Config};
use aisle_crawler::crawler::run_crawl;
use aisle_crawler::{CrawlError, ListingState};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GRID_PATH: &str = "/on/demandware.store/Sites-shop/default/Search-UpdateGrid";

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, csv_path: &Path) -> Config {
    parse_config(&format!(
        r#"
[site]
root-url = "{base_url}/"
allowed-domains = ["127.0.0.1"]
denied-url-patterns = [".*/promo/"]

[crawler]
max-concurrent-listings = 2
request-timeout-secs = 5
max-retries = 1
retry-delay = 10

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
csv-path = "{}"
"#,
        csv_path.display()
    ))
    .expect("Failed to parse test config")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn tiles(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| {
            format!(
                r#"<div class="productTile">
                     <div class="ct-pdp-link"><a href="/p/{0}.html">{0}</a></div>
                     <p class="pwc-tile--brand">Acme</p>
                     <div class="pwc-tile--price-primary"><span class="value"><span class="ct-price-formatted">€0,99</span></span></div>
                   </div>"#,
                n
            )
        })
        .collect()
}

async fn mount_shop(server: &MockServer) {
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><div class="container-dropdown-first-column">
                 <div class="dropdown-item">
                   <span class="category-info">Destaques</span>
                   <ul><li><a href="/highlights/">Highlights</a></li></ul>
                 </div>
                 <div class="dropdown-item">
                   <span class="category-info">Bread</span>
                   <ul>
                     <li><a href="/bread/rolls/">Rolls</a></li>
                     <li><a href="/bread/loaves/">Loaves</a></li>
                     <li><a href="/bread/promo/">Promo</a></li>
                     <li class="see-all"><a href="/bread/">All bread</a></li>
                   </ul>
                 </div>
               </div></body></html>"#
                .to_string(),
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bread/rolls/"))
        .respond_with(html(format!(
            r#"<html><body>{}
                 <div class="search-results-products-counter">2 of 3 results</div>
                 <div class="search-view-more-products-btn-wrapper"
                      data-url="{}{}?cgid=rolls&amp;start=2&amp;sz=2"></div>
               </body></html>"#,
            tiles(&["r1", "r2"]),
            base_url,
            GRID_PATH
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(GRID_PATH))
        .and(query_param("cgid", "rolls"))
        .and(query_param("start", "2"))
        .respond_with(html(format!("<html><body>{}</body></html>", tiles(&["r3"]))))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bread/loaves/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bread/promo/"))
        .respond_with(html(format!(
            "<html><body>{}</body></html>",
            tiles(&["never"])
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_writes_csv() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server).await;
    let base_url = mock_server.uri();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = dir.path().join("data.csv");
    let config = create_test_config(&base_url, &csv_path);

    let context = run_crawl(config).await.expect("Crawl failed");

    // Rolls: first page plus one "load more" page
    let rolls_url = format!("{}/bread/rolls/", base_url);
    let rolls = context
        .tree
        .find_by_listing_url(&rolls_url)
        .expect("Rolls not discovered");
    let rolls = context.tree.subcategory(rolls).unwrap();
    assert_eq!(rolls.products().len(), 3);
    assert_eq!(rolls.state(), ListingState::Complete);
    assert_eq!(
        rolls.pagination_prefix(),
        Some(format!("{}{}?cgid=rolls", base_url, GRID_PATH).as_str())
    );

    let state_of = |suffix: &str| {
        let node = context
            .tree
            .find_by_listing_url(&format!("{}{}", base_url, suffix))
            .unwrap();
        context.tree.subcategory(node).unwrap().state()
    };
    assert_eq!(state_of("/bread/loaves/"), ListingState::FetchFailed);
    assert_eq!(state_of("/bread/promo/"), ListingState::Filtered);

    assert_eq!(context.stats.categories, 1);
    assert_eq!(context.stats.subcategories, 3);
    assert_eq!(context.stats.products, 3);
    assert_eq!(context.stats.rows_written, 3);
    assert_eq!(context.stats.filtered, 1);
    assert_eq!(context.stats.failed_fetches, 1);
    assert!(context.stats.finished_at.is_some());

    // Deny-listed subcategory is never requested; the failing one is retried once
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/bread/promo/"));
    assert_eq!(
        requests
            .iter()
            .filter(|r| r.url.path() == "/bread/loaves/")
            .count(),
        2
    );

    let mut reader = csv::Reader::from_path(&csv_path).expect("Failed to open CSV");
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 12);
    assert_eq!(&headers[0], "category_name");
    assert_eq!(&headers[11], "product_price_secondary_unit");

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(&record[0], "Bread");
        assert_eq!(&record[1], "Rolls");
        assert_eq!(&record[2], rolls_url.as_str());
        assert_eq!(&record[6], "Acme");
        assert_eq!(&record[8], "€0,99");
    }
    let names: Vec<&str> = records.iter().map(|r| &r[3]).collect();
    assert_eq!(names, vec!["r1", "r2", "r3"]);
}

#[tokio::test]
async fn test_discovery_failure_aborts_without_output() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = dir.path().join("data.csv");
    let config = create_test_config(&mock_server.uri(), &csv_path);

    let result = run_crawl(config).await;

    assert!(matches!(result, Err(CrawlError::Discovery { .. })));
    assert!(!csv_path.exists());
}

#[tokio::test]
async fn test_unwritable_output_is_fatal() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = dir.path().join("no-such-dir").join("data.csv");
    let config = create_test_config(&mock_server.uri(), &csv_path);

    let result = run_crawl(config).await;

    assert!(matches!(result, Err(CrawlError::Io(_))));
}
