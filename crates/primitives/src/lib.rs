//! Core primitives shared by the proof discovery crates.
/// Event correlation into per-(trader, epoch) records
pub mod correlation;
/// Attestation events and correlated records
pub mod events;
/// Fetch configuration, results and the [`Fetcher`] strategy trait
pub mod fetch;
/// A small priority queue used to schedule block range scans
pub mod priority_queue;
/// Retry policies for RPC transports and HTTP operations
pub mod retries;
/// Inclusive block search ranges
pub mod search_range;

pub use correlation::{
    OrphanRiskPolicy, correlate_events, correlate_events_with, correlate_page,
};
pub use events::{
    AttestationEvent, CorrelatedRecord, DataPayload, EventKind, EventPayload, RecordKey,
};
pub use fetch::{
    DEFAULT_BATCH_SIZE, DEFAULT_GRAPHQL_ENDPOINT, FetchConfig, FetchResult, Fetcher,
};
pub use priority_queue::PriorityQueue;
pub use search_range::{BlockSearchRange, generate_search_ranges};
