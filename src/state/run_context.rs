use crate::catalog::CrawlTree;
use crate::output::CrawlStats;

/// Everything one crawl run accumulates
///
/// Owned by a single run and handed back to the caller when the run ends,
/// so separate runs never share state.
#[derive(Debug, Default)]
pub struct RunContext {
    pub tree: CrawlTree,
    pub stats: CrawlStats,
}

impl RunContext {
    pub fn new(tree: CrawlTree) -> Self {
        let mut stats = CrawlStats::start();
        stats.categories = tree.category_count();
        stats.subcategories = tree.subcategory_count();
        Self { tree, stats }
    }
}
