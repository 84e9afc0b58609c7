//! Pagination URL shapes
//!
//! "Load more" pages are served by a backend endpoint whose URLs look
//! nothing like the subcategory listing URL, e.g.
//! `https://shop/on/demandware.store/.../Search-UpdateGrid?cgid=bread&pmin=0.01&start=24&sz=24`.
//! Everything before the offset marker is the pagination prefix, which is
//! stable across pages and identifies the subcategory.

use crate::config::SiteConfig;
use crate::UrlError;

/// Markers that give pagination URLs their shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationMarkers {
    /// Substring present only in "load more" endpoint URLs
    pub endpoint: String,
    /// Query fragment separating the prefix from the page offset
    pub offset: String,
    /// Name of the page-size query parameter
    pub size_param: String,
}

impl PaginationMarkers {
    pub fn from_config(site: &SiteConfig) -> Self {
        Self {
            endpoint: site.pagination_marker.clone(),
            offset: site.offset_marker.clone(),
            size_param: site.page_size_param.clone(),
        }
    }

    /// Builds the URL of the page starting at `offset`
    ///
    /// ```
    /// use aisle_crawler::url::PaginationMarkers;
    ///
    /// let markers = PaginationMarkers::default();
    /// assert_eq!(
    ///     markers.page_url("https://x/y?a=1", 48, 24),
    ///     "https://x/y?a=1&start=48&sz=24"
    /// );
    /// ```
    pub fn page_url(&self, prefix: &str, offset: usize, page_size: usize) -> String {
        format!(
            "{}{}{}&{}={}",
            prefix, self.offset, offset, self.size_param, page_size
        )
    }

    /// Reduces a pagination URL to its prefix using this offset marker
    pub fn reduce<'a>(&self, url: &'a str) -> Result<&'a str, UrlError> {
        reduce_prefix(url, &self.offset)
    }
}

impl Default for PaginationMarkers {
    fn default() -> Self {
        Self {
            endpoint: "demandware.store".to_string(),
            offset: "&start=".to_string(),
            size_param: "sz".to_string(),
        }
    }
}

/// The two kinds of page the correlator receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// First page of a subcategory, fetched from its canonical URL
    Listing,
    /// Follow-up page from the "load more" endpoint
    Pagination,
}

impl ResponseKind {
    /// Classifies a response by the URL it was requested from
    pub fn of(url: &str, markers: &PaginationMarkers) -> Self {
        if url.contains(&markers.endpoint) {
            Self::Pagination
        } else {
            Self::Listing
        }
    }
}

/// Returns the part of `url` before its single `marker`
///
/// The marker must occur exactly once. Anything else means the page handed
/// us a pagination URL we cannot key on.
///
/// ```
/// use aisle_crawler::url::reduce_prefix;
///
/// assert_eq!(
///     reduce_prefix("https://x/y?a=1&start=20&sz=10", "&start=").unwrap(),
///     "https://x/y?a=1"
/// );
/// assert!(reduce_prefix("https://x/y?a=1", "&start=").is_err());
/// ```
pub fn reduce_prefix<'a>(url: &'a str, marker: &str) -> Result<&'a str, UrlError> {
    match url.matches(marker).count() {
        1 => Ok(url.split_once(marker).map(|(prefix, _)| prefix).unwrap_or(url)),
        0 => Err(UrlError::MissingOffsetMarker {
            url: url.to_string(),
            marker: marker.to_string(),
        }),
        count => Err(UrlError::RepeatedOffsetMarker {
            url: url.to_string(),
            marker: marker.to_string(),
            count,
        }),
    }
}
