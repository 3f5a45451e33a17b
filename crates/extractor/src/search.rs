//! Backward scan for the most recent block with attestation activity.
use eyre::Result;
use primitives::{BlockSearchRange, PriorityQueue, generate_search_ranges};
use storage::{LatestBlockCache, Storage};
use tracing::{debug, info};

use crate::reader::{ChainReader, LogQuery};

/// Find the most recent block holding a log of the reader's contract.
///
/// Scans `[0, head]` in chunks of `batch_size` blocks, newest chunk first, and stops
/// at the first chunk with any log, returning the highest block number seen in it.
/// Returns 0 when no chunk has a log.
pub async fn find_latest_active_block<R>(reader: &R, batch_size: u64) -> Result<u64>
where
    R: ChainReader + ?Sized,
{
    let head = reader.block_number().await?;
    let address = reader.address();

    let mut queue = PriorityQueue::new();
    for range in generate_search_ranges(head, batch_size) {
        queue.enqueue(range, range.to as i64);
    }
    debug!(head, batch_size, ranges = queue.len(), "Scanning for latest active block");

    let mut scanned = 0usize;
    while let Some(BlockSearchRange { from, to, .. }) = queue.dequeue() {
        scanned += 1;
        let logs = reader.logs(&LogQuery::any(address, from, to)).await?;
        if let Some(block) = logs.iter().filter_map(|log| log.block_number).max() {
            info!(%address, block, scanned, "Found latest active block");
            return Ok(block);
        }
    }

    info!(%address, scanned, "No attestation activity found");
    Ok(0)
}

/// Like [`find_latest_active_block`], but consults and refreshes the latest block cache.
pub async fn latest_active_block<R, S>(
    reader: &R,
    cache: &LatestBlockCache<S>,
    rpc_url: &str,
    batch_size: u64,
) -> Result<u64>
where
    R: ChainReader + ?Sized,
    S: Storage,
{
    let address = reader.address();
    if let Some(block) = cache.get_cached_latest_active_block(rpc_url, &address) {
        debug!(%address, block, "Using cached latest active block");
        return Ok(block);
    }

    let block = find_latest_active_block(reader, batch_size).await?;
    cache.cache_latest_active_block(rpc_url, &address, block);
    Ok(block)
}
