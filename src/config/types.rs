use serde::Deserialize;

/// Main configuration structure for Aisle Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// The site being mapped and how its URLs are shaped
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Discovery page holding the category navigation menu
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Host patterns that may be fetched (e.g., "shop.example.com" or "*.example.com").
    /// An empty list allows every host.
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Regular expressions; any URL matching one of them is never fetched
    #[serde(rename = "denied-url-patterns", default)]
    pub denied_url_patterns: Vec<String>,

    /// Name of the featured/promotional category that is left out of the tree
    #[serde(rename = "excluded-category", default = "default_excluded_category")]
    pub excluded_category: String,

    /// Substring that only appears in "load more" endpoint URLs
    #[serde(rename = "pagination-marker", default = "default_pagination_marker")]
    pub pagination_marker: String,

    /// Query fragment separating a pagination prefix from its offset
    #[serde(rename = "offset-marker", default = "default_offset_marker")]
    pub offset_marker: String,

    /// Query parameter carrying the page size on pagination URLs
    #[serde(rename = "page-size-param", default = "default_page_size_param")]
    pub page_size_param: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of subcategories whose listings are crawled at the same time
    #[serde(rename = "max-concurrent-listings")]
    pub max_concurrent_listings: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Retries for timeouts and 5xx responses
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay: u64,

    /// Minimum time between two consecutive requests (milliseconds)
    #[serde(rename = "minimum-request-interval")]
    pub minimum_request_interval: u64,

    /// Whether "load more" pages are fetched after the first listing page
    #[serde(rename = "follow-pagination")]
    pub follow_pagination: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_listings: 1,
            request_timeout_secs: 30,
            max_retries: 2,
            retry_delay: 5000,
            minimum_request_interval: 0,
            follow_pagination: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV file written at the end of the run
    #[serde(rename = "csv-path")]
    pub csv_path: String,
}

/// Structural locators used to read the discovery and listing pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    pub category_block: String,
    pub category_name: String,
    /// Class marking the "see all" entry of a category's link list
    pub see_all_class: String,

    pub product_tile: String,
    pub product_link: String,
    pub product_image: String,
    pub product_image_attr: String,
    pub product_brand: String,
    pub product_quantity: String,
    pub product_price: String,
    pub product_price_unit: String,
    pub product_price_secondary: String,
    pub product_price_secondary_unit: String,

    pub results_counter: String,
    pub load_more: String,
    pub load_more_attr: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            category_block: ".container-dropdown-first-column > .dropdown-item".to_string(),
            category_name: ".category-info".to_string(),
            see_all_class: "see-all".to_string(),
            product_tile: ".productTile".to_string(),
            product_link: ".ct-pdp-link > a".to_string(),
            product_image: "picture > img".to_string(),
            product_image_attr: "data-src".to_string(),
            product_brand: ".pwc-tile--brand".to_string(),
            product_quantity: ".pwc-tile--quantity".to_string(),
            product_price: ".pwc-tile--price-primary > .value > .ct-price-formatted".to_string(),
            product_price_unit: ".pwc-tile--price-primary > .value > .pwc-m-unit".to_string(),
            product_price_secondary: ".pwc-tile--price-secondary > .ct-price-value".to_string(),
            product_price_secondary_unit: ".pwc-tile--price-secondary > .pwc-m-unit".to_string(),
            results_counter: ".search-results-products-counter".to_string(),
            load_more: ".search-view-more-products-btn-wrapper".to_string(),
            load_more_attr: "data-url".to_string(),
        }
    }
}

fn default_excluded_category() -> String {
    "Destaques".to_string()
}

fn default_pagination_marker() -> String {
    "demandware.store".to_string()
}

fn default_offset_marker() -> String {
    "&start=".to_string()
}

fn default_page_size_param() -> String {
    "sz".to_string()
}
