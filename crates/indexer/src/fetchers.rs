use std::collections::HashSet;

use async_trait::async_trait;
use eyre::Result;
use primitives::{EventKind, FetchConfig, FetchResult, Fetcher, correlate_page};
use tracing::{debug, info};

use crate::client::{AttestationsQuery, IndexerClient};

/// Number of items requested per collection and query.
pub const GRAPHQL_PAGE_SIZE: usize = 100;

/// Page through the indexer, newest first, until at least `min_count` correlated
/// records are collected or the indexer runs out of attestations.
///
/// Data attestations are paged at or below `cursor`. Risk attestations are then
/// read from the lowest data block upwards with no upper bound, so a risk value
/// landing above the cursor still joins its data record. Those late risk events
/// only join keys present in this page.
///
/// The returned `next_cursor` is inclusive, so records at the boundary block are
/// returned again on the next call and must be deduplicated by the caller.
pub async fn fetch_until_enough_events_graphql(
    client: &IndexerClient,
    config: &FetchConfig,
    min_count: usize,
    cursor: Option<u64>,
) -> Result<FetchResult> {
    let mut data_events = Vec::new();
    let mut keys = HashSet::new();
    let mut query = AttestationsQuery {
        before_block: cursor,
        kind: Some(EventKind::Data),
        ..AttestationsQuery::new(GRAPHQL_PAGE_SIZE)
    };

    let exhausted = loop {
        let page = client.fetch_graphql_attestations(config, &query).await?;
        if page.data_items == 0 {
            break true;
        }
        keys.extend(page.data_events.iter().map(|event| event.key()));
        data_events.extend(page.data_events);

        if page.data_items < GRAPHQL_PAGE_SIZE {
            break true;
        }
        if keys.len() >= min_count {
            break false;
        }
        query.skip += GRAPHQL_PAGE_SIZE;
        debug!(skip = query.skip, keys = keys.len(), min_count, "Requesting next GraphQL page");
    };

    let lowest = data_events.iter().map(|event| event.block_number).min();
    let mut risk_events = Vec::new();
    let mut query = AttestationsQuery {
        after_block: if exhausted { None } else { lowest },
        kind: Some(EventKind::Risk),
        ..AttestationsQuery::new(GRAPHQL_PAGE_SIZE)
    };
    loop {
        let page = client.fetch_graphql_attestations(config, &query).await?;
        risk_events.extend(page.risk_events);
        if page.risk_items < GRAPHQL_PAGE_SIZE {
            break;
        }
        query.skip += GRAPHQL_PAGE_SIZE;
    }

    let events = correlate_page(&data_events, &risk_events, config.orphan_risk_events, cursor);
    let last_checked_block = events.iter().map(|record| record.block_number).min().unwrap_or(0);
    let next_cursor = if exhausted { None } else { lowest };

    info!(
        ?cursor,
        data = data_events.len(),
        risk = risk_events.len(),
        records = events.len(),
        last_checked_block,
        exhausted,
        "Fetched proofs from GraphQL"
    );
    Ok(FetchResult { events, last_checked_block, next_cursor })
}

/// [`Fetcher`] backed by the GraphQL indexer.
#[derive(Debug, Clone, Default)]
pub struct GraphQlFetcher {
    client: IndexerClient,
}

impl GraphQlFetcher {
    /// Create a fetcher over `client`.
    pub const fn new(client: IndexerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for GraphQlFetcher {
    async fn fetch_page(
        &self,
        config: &FetchConfig,
        min_count: usize,
        cursor: Option<u64>,
    ) -> Result<FetchResult> {
        fetch_until_enough_events_graphql(&self.client, config, min_count, cursor).await
    }
}
