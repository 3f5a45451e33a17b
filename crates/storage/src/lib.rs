//! Persistence backends and the latest-active-block cache.
/// Persistence backends
pub mod backend;
/// Short-lived cache of the latest block with attestation activity
pub mod latest_block;

pub use backend::{FileStorage, MemoryStorage, Storage};
pub use latest_block::{CachedBlockEntry, LATEST_BLOCK_TTL, LatestBlockCache};
