use async_trait::async_trait;
use eyre::{Result, eyre};
use primitives::{FetchConfig, FetchResult, Fetcher};
use tracing::{info, warn};

/// Try `primary` when `config.use_graphql` is set, delegating to `fallback` when it
/// fails. With GraphQL disabled `primary` is never called.
///
/// Errors from `primary` propagate unchanged when no fallback is supplied.
pub async fn fetch_events_with_fallback<P, F>(
    primary: &P,
    config: &FetchConfig,
    min_count: usize,
    start_from_block: Option<u64>,
    fallback: Option<&F>,
) -> Result<FetchResult>
where
    P: Fetcher + ?Sized,
    F: Fetcher + ?Sized,
{
    if !config.use_graphql {
        let Some(fallback) = fallback else {
            return Err(eyre!("GraphQL is disabled and no fallback fetcher is configured"));
        };
        info!("GraphQL disabled, fetching from fallback");
        return fallback.fetch_page(config, min_count, start_from_block).await;
    }

    match primary.fetch_page(config, min_count, start_from_block).await {
        Ok(result) => Ok(result),
        Err(e) => match fallback {
            Some(fallback) => {
                warn!(err = %e, "GraphQL fetch failed, falling back");
                fallback.fetch_page(config, min_count, start_from_block).await
            }
            None => Err(e),
        },
    }
}

/// [`Fetcher`] composing a primary source with an optional fallback.
#[derive(Debug, Clone)]
pub struct FallbackFetcher<P, F> {
    primary: P,
    fallback: Option<F>,
}

impl<P: Fetcher, F: Fetcher> FallbackFetcher<P, F> {
    /// Compose `primary` with `fallback`.
    pub const fn new(primary: P, fallback: Option<F>) -> Self {
        Self { primary, fallback }
    }

    /// The primary fetcher
    pub const fn primary(&self) -> &P {
        &self.primary
    }

    /// The fallback fetcher, if any
    pub const fn fallback(&self) -> Option<&F> {
        self.fallback.as_ref()
    }
}

#[async_trait]
impl<P: Fetcher, F: Fetcher> Fetcher for FallbackFetcher<P, F> {
    async fn fetch_page(
        &self,
        config: &FetchConfig,
        min_count: usize,
        cursor: Option<u64>,
    ) -> Result<FetchResult> {
        fetch_events_with_fallback(&self.primary, config, min_count, cursor, self.fallback.as_ref())
            .await
    }
}
