//! Proofscope configuration
use std::path::PathBuf;

use alloy_primitives::Address;
use clap::{Parser, ValueEnum};
use primitives::{
    DEFAULT_BATCH_SIZE, DEFAULT_GRAPHQL_ENDPOINT, FetchConfig, OrphanRiskPolicy,
};
use url::Url;

/// RPC endpoint configuration options
#[derive(Debug, Clone, Parser)]
pub struct RpcOpts {
    /// Chain RPC URL
    #[clap(long, env = "RPC_URL")]
    pub rpc_url: Option<Url>,
    /// Attestation contract address
    #[clap(long, env = "ATTESTATION_ADDRESS")]
    pub attestation_address: Option<Address>,
}

/// GraphQL indexer configuration options
#[derive(Debug, Clone, Parser)]
pub struct IndexerOpts {
    /// GraphQL indexer endpoint
    #[clap(long, env = "GRAPHQL_ENDPOINT", default_value = DEFAULT_GRAPHQL_ENDPOINT)]
    pub graphql_endpoint: Url,
    /// Skip the indexer and scan logs over RPC only
    #[clap(long, env = "DISABLE_GRAPHQL")]
    pub disable_graphql: bool,
}

/// Handling of risk attestations without a data attestation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OrphanRiskArg {
    /// Drop them
    #[default]
    Drop,
    /// Keep them as records without data
    Retain,
}

impl From<OrphanRiskArg> for OrphanRiskPolicy {
    fn from(arg: OrphanRiskArg) -> Self {
        match arg {
            OrphanRiskArg::Drop => Self::Drop,
            OrphanRiskArg::Retain => Self::Retain,
        }
    }
}

/// Block scan and pagination options
#[derive(Debug, Clone, Parser)]
pub struct ScanOpts {
    /// Width of a single log query window, in blocks
    #[clap(
        long,
        env = "SCAN_BATCH_SIZE",
        default_value_t = DEFAULT_BATCH_SIZE,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub batch_size: u64,
    /// Rows per page of proofs
    #[clap(long, env = "PAGE_SIZE", default_value = "10")]
    pub page_size: usize,
    /// What to do with risk attestations that have no data attestation
    #[clap(long, env = "ORPHAN_RISK_EVENTS", value_enum, default_value_t = OrphanRiskArg::Drop)]
    pub orphan_risk_events: OrphanRiskArg,
}

/// Persistence options
#[derive(Debug, Clone, Parser)]
pub struct StorageOpts {
    /// File holding the proofs and latest block caches
    #[clap(long, env = "PROOFS_CACHE_FILE", default_value = ".proofscope-cache.json")]
    pub cache_file: PathBuf,
}

/// CLI options for proofscope
#[derive(Debug, Clone, Parser)]
pub struct Opts {
    /// RPC endpoint configuration
    #[clap(flatten)]
    pub rpc: RpcOpts,

    /// GraphQL indexer configuration
    #[clap(flatten)]
    pub indexer: IndexerOpts,

    /// Block scan configuration
    #[clap(flatten)]
    pub scan: ScanOpts,

    /// Persistence configuration
    #[clap(flatten)]
    pub storage: StorageOpts,
}

impl Opts {
    /// Fetch configuration shared by every fetcher.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            rpc_url: self.rpc.rpc_url.clone(),
            attestation_address: self.rpc.attestation_address,
            graphql_endpoint: Some(self.indexer.graphql_endpoint.clone()),
            use_graphql: !self.indexer.disable_graphql,
            batch_size: self.scan.batch_size,
            orphan_risk_events: self.scan.orphan_risk_events.into(),
            ..Default::default()
        }
    }
}
