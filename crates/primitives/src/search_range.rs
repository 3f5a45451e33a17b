//! Inclusive block search ranges used to scan backward from the chain head.
use serde::{Deserialize, Serialize};

/// An inclusive `[from, to]` block range scanned as one log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSearchRange {
    /// First block of the range (inclusive)
    pub from: u64,
    /// Last block of the range (inclusive)
    pub to: u64,
    /// Nominal width of the range
    pub step: u64,
}

impl BlockSearchRange {
    /// Number of blocks covered by the range.
    pub const fn width(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// Split `[0, latest_block]` into ranges of at most `batch_size` blocks, newest first.
///
/// Ranges are contiguous and non-overlapping, and the last one always starts at 0.
/// A `latest_block` of 0 or a `batch_size` of 0 yields no ranges.
pub fn generate_search_ranges(latest_block: u64, batch_size: u64) -> Vec<BlockSearchRange> {
    if latest_block == 0 || batch_size == 0 {
        return Vec::new();
    }
    if batch_size > latest_block {
        return vec![BlockSearchRange { from: 0, to: latest_block, step: batch_size }];
    }

    let mut ranges = Vec::with_capacity((latest_block / batch_size + 1) as usize);
    let mut to = latest_block;
    loop {
        let from = to.saturating_sub(batch_size - 1);
        ranges.push(BlockSearchRange { from, to, step: batch_size });
        if from == 0 {
            break;
        }
        to = from - 1;
    }
    ranges
}
