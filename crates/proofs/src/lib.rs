//! Persisted proof records and page-windowed access to them.
/// Deduplicated, sorted and persisted proof records
pub mod cache;
/// Fill-on-demand pagination over the proofs cache
pub mod pagination;

pub use cache::{CURRENT_PAGE_KEY, PROOFS_CACHE_KEY, ProofsCache};
pub use pagination::{DEFAULT_PAGE_SIZE, ProofsPagination};
