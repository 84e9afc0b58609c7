//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Refusing URLs outside the allow-list or on the deny-list
//! - Throttling consecutive requests
//! - Retry logic for transient failures
//! - Error classification

use crate::config::{Config, UserAgentConfig};
use crate::url::UrlFilter;
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

/// A fetched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// The URL that was requested; responses are correlated on this
    pub url: Url,
    /// Page body content
    pub body: String,
}

impl Page {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }
}

/// Why a URL produced no document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{url} refused by allow/deny configuration")]
    Filtered { url: String },

    #[error("HTTP {status_code} for {url}")]
    Status { url: String, status_code: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },
}

impl FetchError {
    /// Returns true for failures worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Status { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// The page-fetch capability the coordinator dispatches through
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns its document
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use aisle_crawler::config::UserAgentConfig;
/// use aisle_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "AisleCrawler".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Enforces a minimum interval between consecutive requests
#[derive(Debug)]
struct Throttle {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// `Fetcher` backed by reqwest
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | URL refused by filter | Immediate → Filtered, never requested |
/// | HTTP 5xx | Retry up to `max-retries` times |
/// | Timeout | Retry up to `max-retries` times |
/// | Other HTTP error | Immediate → Status |
/// | Non-HTML body | Immediate → ContentMismatch |
/// | Connection refused | Immediate → Network |
pub struct HttpFetcher {
    client: Client,
    filter: UrlFilter,
    throttle: Throttle,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(client: Client, filter: UrlFilter) -> Self {
        Self {
            client,
            filter,
            throttle: Throttle::new(Duration::ZERO),
            max_retries: 0,
            retry_delay: Duration::ZERO,
        }
    }

    /// Builds a fetcher from the `[site]`, `[crawler]` and `[user-agent]` sections
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?;
        let filter = UrlFilter::from_config(&config.site)?;

        Ok(Self::new(client, filter)
            .with_retries(
                config.crawler.max_retries,
                Duration::from_millis(config.crawler.retry_delay),
            )
            .with_min_interval(Duration::from_millis(
                config.crawler.minimum_request_interval,
            )))
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.throttle = Throttle::new(interval);
        self
    }

    /// One GET request, classified
    async fn fetch_once(&self, url: &Url) -> Result<Page, FetchError> {
        self.throttle.wait().await;
        tracing::info!("Visiting {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else if e.is_connect() {
                FetchError::Network {
                    url: url.to_string(),
                    message: "Connection refused".to_string(),
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status_code: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // A missing Content-Type is accepted
        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(Page::new(url.clone(), body))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        if !self.filter.permits(url) {
            return Err(FetchError::Filtered {
                url: url.to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} (attempt {}/{}), retrying in {:?}",
                        e,
                        attempt,
                        self.max_retries + 1,
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                result => return result,
            }
        }
    }
}
