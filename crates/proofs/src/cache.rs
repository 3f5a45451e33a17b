use std::{cmp::Ordering, collections::HashMap};

use eyre::{Result, WrapErr};
use primitives::{CorrelatedRecord, RecordKey};
use storage::Storage;
use tracing::{debug, warn};

/// Storage key of the persisted records.
pub const PROOFS_CACHE_KEY: &str = "taas-proofs-cache";
/// Storage key of the persisted page index.
pub const CURRENT_PAGE_KEY: &str = "taas-proofs-current-page";

fn newest_first(a: &CorrelatedRecord, b: &CorrelatedRecord) -> Ordering {
    b.epoch.cmp(&a.epoch).then_with(|| b.trader_id.cmp(&a.trader_id))
}

/// Correlated records deduplicated by `(trader_id, epoch)`, sorted by epoch then
/// trader id, both descending, and mirrored into a [`Storage`] backend.
#[derive(Debug)]
pub struct ProofsCache<S> {
    storage: S,
    proofs: Vec<CorrelatedRecord>,
    current_page: usize,
}

impl<S: Storage> ProofsCache<S> {
    /// Load the cache from `storage`. Missing or malformed entries load as empty.
    pub fn load(storage: S) -> Self {
        let mut proofs: Vec<CorrelatedRecord> = match storage.get(PROOFS_CACHE_KEY) {
            Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(err = %e, "Ignoring malformed proofs cache");
                Vec::new()
            }),
            None => Vec::new(),
        };
        proofs.sort_by(newest_first);

        let current_page = storage
            .get(CURRENT_PAGE_KEY)
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or_default();

        debug!(proofs = proofs.len(), current_page, "Loaded proofs cache");
        Self { storage, proofs, current_page }
    }

    /// Cached records, newest epoch first
    pub fn proofs(&self) -> &[CorrelatedRecord] {
        &self.proofs
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    /// Whether no record is cached
    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    /// Persisted page index, unclamped
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    /// Lowest block number among the cached records.
    pub fn lowest_block(&self) -> Option<u64> {
        self.proofs.iter().map(|record| record.block_number).min()
    }

    /// Merge `records` into the cache and persist the result.
    ///
    /// A record replaces any cached record with the same key. Returns the number of
    /// keys that were not cached before. On a storage failure the cache is unchanged.
    pub fn update_proofs(&mut self, records: Vec<CorrelatedRecord>) -> Result<usize> {
        let mut merged = self.proofs.clone();
        let mut index: HashMap<RecordKey, usize> =
            merged.iter().enumerate().map(|(pos, record)| (record.key(), pos)).collect();

        let mut added = 0;
        for record in records {
            match index.get(&record.key()) {
                Some(&pos) => merged[pos] = record,
                None => {
                    index.insert(record.key(), merged.len());
                    merged.push(record);
                    added += 1;
                }
            }
        }
        merged.sort_by(newest_first);

        let text = serde_json::to_string(&merged)?;
        self.storage.set(PROOFS_CACHE_KEY, &text).wrap_err("failed to persist proofs cache")?;
        self.proofs = merged;

        debug!(added, total = self.proofs.len(), "Updated proofs cache");
        Ok(added)
    }

    /// Set and persist the current page index.
    pub fn update_current_page(&mut self, page: usize) -> Result<()> {
        self.storage
            .set(CURRENT_PAGE_KEY, &page.to_string())
            .wrap_err("failed to persist current page")?;
        self.current_page = page;
        Ok(())
    }

    /// Drop every cached record. The page index is kept.
    pub fn clear(&mut self) -> Result<()> {
        self.storage.remove(PROOFS_CACHE_KEY).wrap_err("failed to clear proofs cache")?;
        self.proofs.clear();
        Ok(())
    }
}
