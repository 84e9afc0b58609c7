/// Listing state definitions for tracking subcategory crawl progress
///
/// Every subcategory starts `Pending` and ends the run in one of the other states.
use std::fmt;

/// Represents how far the crawl of one subcategory got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingState {
    // ===== Active States =====
    /// Listing page has not been fetched yet
    Pending,

    /// First page processed and a pagination prefix recorded; more pages are declared
    Listed,

    // ===== Terminal Success States =====
    /// Accumulated product count reached the declared total
    Complete,

    // ===== Terminal Degraded States =====
    /// Pagination stopped before the declared total was reached
    Partial,

    /// First page processed but its results counter could not be read,
    /// so no further pages are known
    CounterUnparsed,

    // ===== Terminal Error States =====
    /// Listing URL was refused by the allow/deny configuration
    Filtered,

    /// Listing page could not be fetched
    FetchFailed,
}

impl ListingState {
    /// Returns true if no further processing will happen for this subcategory
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Listed)
    }

    /// Returns true if the subcategory yielded at least its first page
    pub fn has_products_page(&self) -> bool {
        matches!(
            self,
            Self::Listed | Self::Complete | Self::Partial | Self::CounterUnparsed
        )
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Filtered | Self::FetchFailed)
    }

    /// Stable snake_case name used in logs and the statistics report
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Listed => "listed",
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::CounterUnparsed => "counter_unparsed",
            Self::Filtered => "filtered",
            Self::FetchFailed => "fetch_failed",
        }
    }

    /// Returns all possible listing states
    pub fn all_states() -> [Self; 7] {
        [
            Self::Pending,
            Self::Listed,
            Self::Complete,
            Self::Partial,
            Self::CounterUnparsed,
            Self::Filtered,
            Self::FetchFailed,
        ]
    }
}

impl fmt::Display for ListingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
