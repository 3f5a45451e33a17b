use eyre::Report;
use primitives::retries::retry_with_backoff_if;
use reqwest::{Error as ReqwestError, StatusCode};

/// Whether a failed indexer request is worth retrying: timeouts, connect errors,
/// server errors and rate limiting.
fn is_retryable(err: &Report) -> bool {
    let Some(req_err) = err.downcast_ref::<ReqwestError>() else {
        return false;
    };
    if req_err.is_timeout() || req_err.is_connect() {
        return true;
    }
    req_err
        .status()
        .is_some_and(|status| status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS)
}

/// Retry the provided async operation with exponential backoff while its error is
/// retryable.
pub(crate) async fn retry_op<F, Fut, T>(op: F) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = eyre::Result<T>>,
{
    retry_with_backoff_if(op, is_retryable).await
}
