use eyre::Result;
use primitives::{CorrelatedRecord, FetchConfig, Fetcher};
use storage::Storage;
use tracing::{debug, info, warn};

use crate::cache::ProofsCache;

/// Rows per page when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page-windowed view over a [`ProofsCache`], fetching more records through a
/// [`Fetcher`] when a requested page is not yet covered by the cache.
#[derive(Debug)]
pub struct ProofsPagination<S, F> {
    cache: ProofsCache<S>,
    fetcher: F,
    config: FetchConfig,
    page_size: usize,
    has_more: bool,
    cursor: Option<u64>,
}

impl<S: Storage, F: Fetcher> ProofsPagination<S, F> {
    /// Create a pagination over `cache`. A zero `page_size` is treated as one.
    pub fn new(cache: ProofsCache<S>, fetcher: F, config: FetchConfig, page_size: usize) -> Self {
        Self { cache, fetcher, config, page_size: page_size.max(1), has_more: true, cursor: None }
    }

    /// The underlying cache
    pub const fn cache(&self) -> &ProofsCache<S> {
        &self.cache
    }

    /// Rows per page
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether the source may hold records that are not cached yet
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    /// Current page, clamped to `len / page_size` so a stale persisted index never
    /// points past the cached records.
    pub fn page(&self) -> usize {
        self.cache.current_page().min(self.cache.len() / self.page_size)
    }

    /// Records of the current page.
    pub fn visible_proofs(&self) -> &[CorrelatedRecord] {
        let proofs = self.cache.proofs();
        let start = (self.page() * self.page_size).min(proofs.len());
        let end = (start + self.page_size).min(proofs.len());
        &proofs[start..end]
    }

    /// Fetch records until `page` is covered, unless the cache already covers it or
    /// the source is exhausted.
    ///
    /// A fetch that adds no new record, or that reports no continuation, marks the
    /// source as exhausted. A failed fetch leaves [`Self::has_more`] untouched so the
    /// caller can retry.
    pub async fn ensure_page(&mut self, page: usize) -> Result<()> {
        let needed = page.saturating_add(1).saturating_mul(self.page_size);
        let cached = self.cache.len();
        if cached >= needed || !self.has_more {
            return Ok(());
        }

        let min_count = needed - cached;
        let cursor = self.cursor.or_else(|| self.cache.lowest_block());
        debug!(page, cached, min_count, ?cursor, "Fetching proofs for page");

        let result = match self.fetcher.fetch_page(&self.config, min_count, cursor).await {
            Ok(result) => result,
            Err(e) => {
                warn!(err = %e, page, "Failed to fetch proofs");
                return Err(e);
            }
        };

        let added = self.cache.update_proofs(result.events)?;
        self.cursor = result.next_cursor;
        self.has_more = added > 0 && result.next_cursor.is_some();
        info!(page, added, total = self.cache.len(), has_more = self.has_more, "Fetched proofs");
        Ok(())
    }

    /// Move to `page`, persisting it, and fill it from the fetcher when needed.
    pub async fn handle_page_change(&mut self, page: usize) -> Result<&[CorrelatedRecord]> {
        self.cache.update_current_page(page)?;
        self.ensure_page(page).await?;
        Ok(self.visible_proofs())
    }

    /// Fill the current page, as done on first load.
    pub async fn load_current_page(&mut self) -> Result<&[CorrelatedRecord]> {
        self.ensure_page(self.cache.current_page()).await?;
        Ok(self.visible_proofs())
    }
}
