//! Proof discovery over direct JSON-RPC log scans.
/// RPC event fetchers and consensus record reads
pub mod fetchers;
/// Log formatters
pub mod format;
/// Chain access seam and the alloy-backed client
pub mod reader;
/// [`primitives::Fetcher`] backed by log scans
pub mod rpc_fetcher;
/// Latest active block search
pub mod search;

#[cfg(test)]
mod test_utils;

pub use fetchers::{
    ConsensusRecord, EventBatch, fetch_data_record, fetch_events_batch, fetch_risk_record,
    fetch_until_enough_events,
};
pub use format::{format_data_log, format_risk_log};
pub use reader::{AttestationClient, ChainReader, LogQuery};
pub use rpc_fetcher::RpcFetcher;
pub use search::{find_latest_active_block, latest_active_block};
