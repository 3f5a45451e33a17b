use std::time::Duration;

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::Storage;

/// How long a cached latest active block stays valid.
pub const LATEST_BLOCK_TTL: Duration = Duration::from_secs(10 * 60);

/// A persisted latest active block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedBlockEntry {
    /// Latest block with attestation activity
    pub block_number: u64,
    /// When the entry was written, in UNIX milliseconds
    pub timestamp: i64,
}

impl CachedBlockEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis().saturating_sub(self.timestamp) > LATEST_BLOCK_TTL.as_millis() as i64
    }
}

/// Caches the latest active block per `(rpc_url, contract address)` so repeat loads
/// skip the backward scan.
#[derive(Debug, Clone)]
pub struct LatestBlockCache<S> {
    storage: S,
}

impl<S: Storage> LatestBlockCache<S> {
    /// Create a cache over the given storage backend
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Storage key of the entry for `rpc_url` and `address`.
    pub fn key(rpc_url: &str, address: &Address) -> String {
        format!("latestActiveBlock:{rpc_url}:{address}")
    }

    /// Remember `block_number` as the latest active block.
    ///
    /// Write failures are logged and otherwise ignored.
    pub fn cache_latest_active_block(&self, rpc_url: &str, address: &Address, block_number: u64) {
        let entry = CachedBlockEntry { block_number, timestamp: Utc::now().timestamp_millis() };
        let key = Self::key(rpc_url, address);
        let result = serde_json::to_string(&entry)
            .map_err(eyre::Report::from)
            .and_then(|value| self.storage.set(&key, &value));
        match result {
            Ok(()) => debug!(key, block_number, "Cached latest active block"),
            Err(e) => warn!(key, err = %e, "Failed to cache latest active block"),
        }
    }

    /// Read the cached latest active block, if present and fresh.
    pub fn get_cached_latest_active_block(&self, rpc_url: &str, address: &Address) -> Option<u64> {
        self.get_at(rpc_url, address, Utc::now())
    }

    fn get_at(&self, rpc_url: &str, address: &Address, now: DateTime<Utc>) -> Option<u64> {
        let key = Self::key(rpc_url, address);
        let raw = self.storage.get(&key)?;
        let entry: CachedBlockEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, err = %e, "Ignoring malformed latest block cache entry");
                return None;
            }
        };

        if entry.is_expired(now) {
            debug!(key, "Latest block cache entry expired");
            if let Err(e) = self.storage.remove(&key) {
                warn!(key, err = %e, "Failed to remove expired cache entry");
            }
            return None;
        }

        Some(entry.block_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;
    use std::sync::Arc;

    const RPC: &str = "https://rpc.example";

    fn write_entry(storage: &MemoryStorage, block_number: u64, age: Duration) {
        let timestamp = Utc::now().timestamp_millis() - age.as_millis() as i64;
        let value = serde_json::to_string(&CachedBlockEntry { block_number, timestamp }).unwrap();
        storage.set(&LatestBlockCache::<MemoryStorage>::key(RPC, &Address::ZERO), &value).unwrap();
    }

    #[test]
    fn round_trip_within_ttl() {
        let cache = LatestBlockCache::new(MemoryStorage::new());
        cache.cache_latest_active_block(RPC, &Address::ZERO, 30_000);
        assert_eq!(cache.get_cached_latest_active_block(RPC, &Address::ZERO), Some(30_000));
    }

    #[test]
    fn entries_are_scoped_by_rpc_and_address() {
        let cache = LatestBlockCache::new(MemoryStorage::new());
        cache.cache_latest_active_block(RPC, &Address::ZERO, 1);
        assert!(cache.get_cached_latest_active_block("https://other", &Address::ZERO).is_none());
        assert!(cache.get_cached_latest_active_block(RPC, &Address::repeat_byte(1)).is_none());
    }

    #[test]
    fn entry_still_valid_just_before_expiry() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(&storage, 42, LATEST_BLOCK_TTL - Duration::from_secs(5));
        let cache = LatestBlockCache::new(Arc::clone(&storage));
        assert_eq!(cache.get_cached_latest_active_block(RPC, &Address::ZERO), Some(42));
    }

    #[test]
    fn expired_entry_is_removed() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(&storage, 42, LATEST_BLOCK_TTL + Duration::from_secs(1));
        let cache = LatestBlockCache::new(Arc::clone(&storage));

        assert!(cache.get_cached_latest_active_block(RPC, &Address::ZERO).is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn malformed_entry_is_a_miss() {
        let storage = Arc::new(MemoryStorage::new());
        let key = LatestBlockCache::<MemoryStorage>::key(RPC, &Address::ZERO);
        storage.set(&key, "not json").unwrap();
        let cache = LatestBlockCache::new(Arc::clone(&storage));

        assert!(cache.get_cached_latest_active_block(RPC, &Address::ZERO).is_none());
        assert_eq!(storage.get(&key).as_deref(), Some("not json"));
    }

    #[test]
    fn key_format() {
        let key = LatestBlockCache::<MemoryStorage>::key(RPC, &Address::ZERO);
        assert_eq!(key, format!("latestActiveBlock:{RPC}:{}", Address::ZERO));
    }
}
