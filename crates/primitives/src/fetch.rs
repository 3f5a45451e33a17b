//! Fetch configuration and the strategy trait implemented by every record source.
use alloy_primitives::Address;
use async_trait::async_trait;
use eyre::Result;
use url::Url;

use crate::{correlation::OrphanRiskPolicy, events::CorrelatedRecord};

/// Default width of a block scan window.
pub const DEFAULT_BATCH_SIZE: u64 = 10_000;

/// GraphQL indexer queried when none is configured.
pub const DEFAULT_GRAPHQL_ENDPOINT: &str =
    "https://api.studio.thegraph.com/query/taas/attestations/version/latest";

/// Configuration passed through the fetchers.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// JSON-RPC endpoint of the chain
    pub rpc_url: Option<Url>,
    /// Address of the attestation contract
    pub attestation_address: Option<Address>,
    /// GraphQL indexer endpoint; the indexer default is used when unset
    pub graphql_endpoint: Option<Url>,
    /// Whether to try the GraphQL indexer before the RPC path
    pub use_graphql: bool,
    /// First block of an explicit scan window
    pub from_block: Option<u64>,
    /// Last block of an explicit scan window
    pub to_block: Option<u64>,
    /// Width of a single log query window
    pub batch_size: u64,
    /// Handling of risk events without a data event
    pub orphan_risk_events: OrphanRiskPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            attestation_address: None,
            graphql_endpoint: None,
            use_graphql: true,
            from_block: None,
            to_block: None,
            batch_size: DEFAULT_BATCH_SIZE,
            orphan_risk_events: OrphanRiskPolicy::default(),
        }
    }
}

impl FetchConfig {
    /// Return a copy of this config scanning the inclusive window `[from_block, to_block]`.
    pub fn with_window(&self, from_block: u64, to_block: u64) -> Self {
        Self { from_block: Some(from_block), to_block: Some(to_block), ..self.clone() }
    }
}

/// Correlated records returned by one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// Correlated records
    pub events: Vec<CorrelatedRecord>,
    /// Lowest block covered by this fetch
    pub last_checked_block: u64,
    /// Cursor for the next fetch, `None` once the source is exhausted
    pub next_cursor: Option<u64>,
}

impl FetchResult {
    /// An empty result signalling an exhausted source.
    pub const fn exhausted() -> Self {
        Self { events: Vec::new(), last_checked_block: 0, next_cursor: None }
    }
}

/// A source of correlated proof records.
///
/// `cursor` is the newest block to consider; `None` starts from the head of the source.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch at least `min_count` records when the source has them.
    async fn fetch_page(
        &self,
        config: &FetchConfig,
        min_count: usize,
        cursor: Option<u64>,
    ) -> Result<FetchResult>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for &F {
    async fn fetch_page(
        &self,
        config: &FetchConfig,
        min_count: usize,
        cursor: Option<u64>,
    ) -> Result<FetchResult> {
        (**self).fetch_page(config, min_count, cursor).await
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    async fn fetch_page(
        &self,
        config: &FetchConfig,
        min_count: usize,
        cursor: Option<u64>,
    ) -> Result<FetchResult> {
        (**self).fetch_page(config, min_count, cursor).await
    }
}
