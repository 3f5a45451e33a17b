//! [`Fetcher`] implementation backed by direct log scans.
use async_trait::async_trait;
use eyre::Result;
use primitives::{EventKind, FetchConfig, FetchResult, Fetcher, correlate_page};
use storage::{LatestBlockCache, Storage};
use tracing::info;

use crate::{
    fetchers::fetch_until_enough_events,
    format::{format_data_log, format_risk_log},
    reader::ChainReader,
    search::latest_active_block,
};

/// Fetches correlated records by scanning contract logs backward.
///
/// Without a cursor the scan starts at the latest active block, found through the
/// latest block cache or a backward search. Risk events are scanned from the lowest
/// covered block up to the chain head, since a risk attestation may be mined after
/// the page that holds its data attestation.
#[derive(Debug)]
pub struct RpcFetcher<R, S> {
    reader: R,
    cache: LatestBlockCache<S>,
    rpc_url: String,
}

impl<R: ChainReader, S: Storage> RpcFetcher<R, S> {
    /// Create a fetcher. `rpc_url` scopes the latest block cache entries.
    pub fn new(reader: R, cache: LatestBlockCache<S>, rpc_url: impl Into<String>) -> Self {
        Self { reader, cache, rpc_url: rpc_url.into() }
    }

    /// The underlying chain reader
    pub const fn reader(&self) -> &R {
        &self.reader
    }
}

#[async_trait]
impl<R: ChainReader, S: Storage> Fetcher for RpcFetcher<R, S> {
    async fn fetch_page(
        &self,
        config: &FetchConfig,
        min_count: usize,
        cursor: Option<u64>,
    ) -> Result<FetchResult> {
        let floor = config.from_block.unwrap_or(0);
        let start = match cursor {
            Some(block) => block,
            None => {
                latest_active_block(&self.reader, &self.cache, &self.rpc_url, config.batch_size)
                    .await?
            }
        };
        if start < floor {
            return Ok(FetchResult::exhausted());
        }

        let data = fetch_until_enough_events(
            &self.reader,
            &config.with_window(floor, start),
            min_count,
            EventKind::Data,
            format_data_log,
        )
        .await?;
        let lowest = data.last_checked_block;

        let head = self.reader.block_number().await?.max(start);
        let risk = fetch_until_enough_events(
            &self.reader,
            &config.with_window(lowest, head),
            usize::MAX,
            EventKind::Risk,
            format_risk_log,
        )
        .await?;

        let events =
            correlate_page(&data.events, &risk.events, config.orphan_risk_events, Some(start));
        let next_cursor = (lowest > floor).then(|| lowest - 1);
        info!(
            start,
            head,
            last_checked_block = lowest,
            data = data.events.len(),
            risk = risk.events.len(),
            records = events.len(),
            "Fetched proofs over RPC"
        );

        Ok(FetchResult { events, last_checked_block: lowest, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockChain, data_log, risk_log};
    use alloy::primitives::Address;
    use primitives::OrphanRiskPolicy;
    use storage::MemoryStorage;

    fn chain() -> MockChain {
        MockChain::new(1_000).with_logs(vec![
            data_log(Address::ZERO, 950, 1, 2),
            risk_log(Address::ZERO, 951, 1, 2, 30),
            data_log(Address::ZERO, 900, 2, 2),
            data_log(Address::ZERO, 400, 3, 1),
            risk_log(Address::ZERO, 401, 3, 1, 10),
            risk_log(Address::ZERO, 402, 9, 9, 10),
        ])
    }

    fn config() -> FetchConfig {
        FetchConfig { batch_size: 100, use_graphql: false, ..Default::default() }
    }

    #[tokio::test]
    async fn first_page_starts_at_latest_active_block() {
        let fetcher = RpcFetcher::new(chain(), LatestBlockCache::new(MemoryStorage::new()), "rpc");
        let result = fetcher.fetch_page(&config(), 2, None).await.unwrap();

        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].risk_events.len(), 1);
        assert_eq!(result.last_checked_block, 852);
        assert_eq!(result.next_cursor, Some(851));
    }

    #[tokio::test]
    async fn cursor_continues_below_previous_page() {
        let fetcher = RpcFetcher::new(chain(), LatestBlockCache::new(MemoryStorage::new()), "rpc");
        let result = fetcher.fetch_page(&config(), 2, Some(851)).await.unwrap();

        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].trader_id, "3");
        assert_eq!(result.events[0].risk_events.len(), 1);
        assert_eq!(result.last_checked_block, 0);
        assert_eq!(result.next_cursor, None);
    }

    #[tokio::test]
    async fn retains_orphans_when_configured() {
        let fetcher = RpcFetcher::new(chain(), LatestBlockCache::new(MemoryStorage::new()), "rpc");
        let config = FetchConfig { orphan_risk_events: OrphanRiskPolicy::Retain, ..config() };
        let result = fetcher.fetch_page(&config, 10, Some(851)).await.unwrap();

        assert_eq!(result.events.len(), 2);
        assert!(result.events[1].data_events.is_empty());
        assert_eq!(result.events[1].trader_id, "9");
    }

    #[tokio::test]
    async fn late_risk_event_is_kept_across_pages() {
        let chain = MockChain::new(1_000).with_logs(vec![
            data_log(Address::ZERO, 950, 1, 2),
            data_log(Address::ZERO, 900, 2, 2),
            data_log(Address::ZERO, 850, 3, 1),
            risk_log(Address::ZERO, 860, 3, 1, 70),
        ]);
        let fetcher = RpcFetcher::new(chain, LatestBlockCache::new(MemoryStorage::new()), "rpc");

        let first = fetcher.fetch_page(&config(), 2, None).await.unwrap();
        let keys: Vec<_> = first.events.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["1-2", "2-2"]);
        assert_eq!(first.next_cursor, Some(850));

        let second = fetcher.fetch_page(&config(), 2, first.next_cursor).await.unwrap();
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.events[0].key().to_string(), "3-1");
        assert_eq!(second.events[0].risk_events.len(), 1);
        assert_eq!(second.events[0].risk_events[0].block_number, 860);
    }

    #[tokio::test]
    async fn empty_chain_is_exhausted() {
        let fetcher =
            RpcFetcher::new(MockChain::new(0), LatestBlockCache::new(MemoryStorage::new()), "rpc");
        let result = fetcher.fetch_page(&config(), 5, None).await.unwrap();
        assert!(result.events.is_empty());
        assert_eq!(result.next_cursor, None);
    }
}
