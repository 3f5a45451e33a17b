use std::time::Duration;

use alloy::transports::{
    RpcError, TransportError, TransportErrorKind,
    layers::{RetryBackoffLayer, RetryPolicy},
};
use alloy_json_rpc::ErrorPayload;
use serde::Deserialize;
use tokio_retry::{RetryIf, strategy::ExponentialBackoff};

/// Maximum number of retries for a failed request.
///
/// With the 1ms initial backoff below, 9 retries complete in roughly 500ms.
const DEFAULT_MAX_RETRIES: u32 = 9;

/// Initial backoff in milliseconds.
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1;

/// Compute units per second assumed for the RPC provider.
const DEFAULT_COMPUTE_UNITS_PER_SECOND: u64 = 100;

/// The [`RetryBackoffLayer`] installed on every RPC client.
pub const DEFAULT_RETRY_LAYER: RetryBackoffLayer<RateLimitConnRefusedRetryPolicy> =
    RetryBackoffLayer::new_with_policy(
        DEFAULT_MAX_RETRIES,
        DEFAULT_INITIAL_BACKOFF_MS,
        DEFAULT_COMPUTE_UNITS_PER_SECOND,
        RateLimitConnRefusedRetryPolicy,
    );

/// Retry classification for [`RpcError`], mirroring alloy's private implementation.
trait RpcErrorExt {
    /// Whether the request should be retried.
    fn is_retryable(&self) -> bool;

    /// Backoff requested by the provider, if any.
    fn backoff_hint(&self) -> Option<Duration>;
}

impl RpcErrorExt for RpcError<TransportErrorKind> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retry_err(),
            Self::DeserError { text, .. } => {
                if let Ok(resp) = serde_json::from_str::<ErrorPayload>(text) {
                    return resp.is_retry_err();
                }

                // Some providers omit the `id` in error responses but still wrap a
                // well-formed error payload.
                #[derive(Deserialize)]
                struct Resp {
                    error: ErrorPayload,
                }

                serde_json::from_str::<Resp>(text).is_ok_and(|resp| resp.error.is_retry_err())
            }
            Self::ErrorResp(err) => err.is_retry_err(),
            Self::NullResp => true,
            _ => false,
        }
    }

    fn backoff_hint(&self) -> Option<Duration> {
        let Self::ErrorResp(resp) = self else {
            return None;
        };
        let Some(Ok(data)) = resp.try_data_as::<serde_json::Value>() else {
            return None;
        };
        // Rate limited providers report the requested backoff in the error data.
        let backoff_seconds = &data["rate"]["backoff_seconds"];
        if let Some(seconds) = backoff_seconds.as_u64() {
            return Some(Duration::from_secs(seconds));
        }
        backoff_seconds.as_f64().map(|seconds| Duration::from_secs(seconds as u64 + 1))
    }
}

/// A retry policy that also retries on "connection refused" errors.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConnRefusedRetryPolicy;

impl RetryPolicy for RateLimitConnRefusedRetryPolicy {
    fn should_retry(&self, error: &TransportError) -> bool {
        error.is_retryable() || is_connection_refused(error)
    }

    fn backoff_hint(&self, error: &TransportError) -> Option<Duration> {
        error.backoff_hint()
    }
}

/// Checks whether the error message contains "connection refused".
#[inline]
pub fn is_connection_refused<S: ToString>(e: S) -> bool {
    e.to_string().to_lowercase().contains("connection refused")
}

/// Retry `op` with [`ExponentialBackoff`] as long as `condition` holds for its error.
///
/// Uses the same retry budget as [`DEFAULT_RETRY_LAYER`].
pub async fn retry_with_backoff_if<F, Fut, T, E, C>(op: F, condition: C) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let strategy = ExponentialBackoff::from_millis(DEFAULT_INITIAL_BACKOFF_MS)
        .take(DEFAULT_MAX_RETRIES as usize);
    RetryIf::spawn(strategy, op, condition).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn detects_connection_refused_case_insensitively() {
        assert!(is_connection_refused("error sending request: Connection Refused (os error 111)"));
        assert!(!is_connection_refused("timed out"));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff_if(
            || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 { Err("busy") } else { Ok(7) }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_when_condition_rejects_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), &str> = retry_with_backoff_if(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("fatal")
            },
            |e| *e != "fatal",
        )
        .await;

        assert_eq!(result, Err("fatal"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
