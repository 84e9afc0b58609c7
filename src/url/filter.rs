use crate::config::SiteConfig;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Decides whether a URL may be dispatched to the network
///
/// A URL passes when its host matches one of the allowed domain patterns
/// (or the list is empty) and none of the deny patterns match anywhere in
/// the full URL string.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    allowed_domains: Vec<String>,
    denied: Vec<Regex>,
}

impl UrlFilter {
    /// Builds a filter from raw host patterns and regex sources
    pub fn new<S: AsRef<str>>(
        allowed_domains: &[S],
        denied_patterns: &[S],
    ) -> Result<Self, ConfigError> {
        let denied = denied_patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| ConfigError::InvalidRegex {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            allowed_domains: allowed_domains
                .iter()
                .map(|d| d.as_ref().to_lowercase())
                .collect(),
            denied,
        })
    }

    /// Builds the filter described by the `[site]` section
    pub fn from_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        Self::new(&site.allowed_domains, &site.denied_url_patterns)
    }

    /// Returns true if the URL's host is on the allow-list
    pub fn is_domain_allowed(&self, url: &Url) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }

        let Some(host) = url.host_str().map(|h| h.to_lowercase()) else {
            return false;
        };

        self.allowed_domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, &host))
    }

    /// Returns the first deny pattern matching the URL, if any
    pub fn denied_by(&self, url: &Url) -> Option<&str> {
        self.denied
            .iter()
            .find(|re| re.is_match(url.as_str()))
            .map(|re| re.as_str())
    }

    /// Returns true if the URL may be fetched
    pub fn permits(&self, url: &Url) -> bool {
        self.is_domain_allowed(url) && self.denied_by(url).is_none()
    }
}

/// Checks if a host matches a pattern
///
/// "shop.example.com" matches only itself; "*.example.com" matches the bare
/// domain and any subdomain of it.
///
/// ```
/// use aisle_crawler::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "shop.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}
