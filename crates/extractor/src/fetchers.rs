//! RPC event fetchers and consensus record reads.
use std::str::FromStr;

use alloy::primitives::U256;
use alloy_rpc_types_eth::Log;
use eyre::{Result, WrapErr, eyre};
use primitives::{AttestationEvent, DataPayload, EventKind, FetchConfig};
use tracing::{debug, warn};

use crate::reader::{ChainReader, LogQuery};

/// Formatted events from one or more log queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBatch {
    /// Formatted events, oldest first within each scanned window
    pub events: Vec<AttestationEvent>,
    /// Lowest block covered by the scan
    pub last_checked_block: u64,
}

/// A consensus value read from the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusRecord<T> {
    /// The aggregated value
    pub record: T,
    /// Whether the attesters reached consensus
    pub has_consensus: bool,
}

/// Fetch and format every `kind` log in `[config.from_block, config.to_block]`.
///
/// Logs that fail to format are logged and skipped.
pub async fn fetch_events_batch<R, F>(
    reader: &R,
    config: &FetchConfig,
    kind: EventKind,
    format: F,
) -> Result<EventBatch>
where
    R: ChainReader + ?Sized,
    F: Fn(&Log) -> Result<AttestationEvent>,
{
    let from_block = config.from_block.ok_or_else(|| eyre!("fetch window has no start block"))?;
    let to_block = config.to_block.ok_or_else(|| eyre!("fetch window has no end block"))?;
    if from_block > to_block {
        return Ok(EventBatch { events: Vec::new(), last_checked_block: from_block });
    }

    let query = LogQuery::event(reader.address(), from_block, to_block, kind);
    let logs = reader.logs(&query).await.wrap_err_with(|| {
        format!("failed to fetch {kind} logs in blocks {from_block}..={to_block}")
    })?;

    let events: Vec<_> = logs
        .iter()
        .filter_map(|log| match format(log) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(
                    err = %e,
                    block = ?log.block_number,
                    tx = ?log.transaction_hash,
                    "Skipping malformed {kind} log"
                );
                None
            }
        })
        .collect();

    debug!(from_block, to_block, logs = logs.len(), count = events.len(), "Fetched {kind} events");
    Ok(EventBatch { events, last_checked_block: from_block })
}

/// Scan backward from `config.to_block` in windows of `config.batch_size` blocks until
/// `min_count` events are collected or `config.from_block` (default 0) is reached.
///
/// Each window is disjoint from and older than the previous one.
pub async fn fetch_until_enough_events<R, F>(
    reader: &R,
    config: &FetchConfig,
    min_count: usize,
    kind: EventKind,
    format: F,
) -> Result<EventBatch>
where
    R: ChainReader + ?Sized,
    F: Fn(&Log) -> Result<AttestationEvent>,
{
    let floor = config.from_block.unwrap_or(0);
    let mut to_block = match config.to_block {
        Some(block) => block,
        None => reader.block_number().await?,
    };
    if to_block < floor {
        return Ok(EventBatch { events: Vec::new(), last_checked_block: floor });
    }
    let window = config.batch_size.max(1);

    let mut events = Vec::new();
    loop {
        let from_block = to_block.saturating_sub(window - 1).max(floor);
        let batch =
            fetch_events_batch(reader, &config.with_window(from_block, to_block), kind, &format)
                .await?;
        events.extend(batch.events);

        if events.len() >= min_count || from_block == floor {
            debug!(count = events.len(), last_checked_block = from_block, "Finished {kind} scan");
            return Ok(EventBatch { events, last_checked_block: from_block });
        }
        to_block = from_block - 1;
    }
}

fn parse_u256(value: &str, field: &str) -> Result<U256> {
    U256::from_str(value).wrap_err_with(|| format!("invalid {field}: {value}"))
}

/// Read the consensus data record for `trader_id` and `epoch`.
pub async fn fetch_data_record<R>(
    reader: &R,
    trader_id: &str,
    epoch: u64,
) -> Result<ConsensusRecord<DataPayload>>
where
    R: ChainReader + ?Sized,
{
    let (record, has_consensus) =
        reader.data_record(parse_u256(trader_id, "trader id")?, U256::from(epoch)).await?;
    Ok(ConsensusRecord {
        record: DataPayload { merkle_root: record.merkleRoot, cid: record.cid },
        has_consensus,
    })
}

/// Read the consensus risk value for `trader_id`, `epoch` and `parameter_id` (default 0).
pub async fn fetch_risk_record<R>(
    reader: &R,
    trader_id: &str,
    epoch: u64,
    parameter_id: Option<u64>,
) -> Result<ConsensusRecord<u64>>
where
    R: ChainReader + ?Sized,
{
    let parameter_id = U256::from(parameter_id.unwrap_or_default());
    let (value, has_consensus) = reader
        .risk_record(parse_u256(trader_id, "trader id")?, U256::from(epoch), parameter_id)
        .await?;
    let record = u64::try_from(value).map_err(|_| eyre!("risk value {value} out of range"))?;
    Ok(ConsensusRecord { record, has_consensus })
}
