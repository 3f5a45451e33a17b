//! Proof discovery through the GraphQL attestation indexer, with fallback to
//! another [`primitives::Fetcher`].
/// GraphQL client and formatters
pub mod client;
/// Primary/fallback fetcher composition
pub mod fallback;
/// Paginated GraphQL fetchers
pub mod fetchers;
/// Retry helpers for HTTP operations
pub mod retry;
#[cfg(test)]
mod test_utils;

pub use client::{
    AttestationsPage, AttestationsQuery, GraphQlDataAttestation, GraphQlRiskAttestation,
    IndexerClient, format_graphql_data_event, format_graphql_risk_event,
};
pub use fallback::{FallbackFetcher, fetch_events_with_fallback};
pub use fetchers::{GRAPHQL_PAGE_SIZE, GraphQlFetcher, fetch_until_enough_events_graphql};
pub use primitives::DEFAULT_GRAPHQL_ENDPOINT;
