//! Bootstrap utilities for processes embedding the history store.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the TELEMETRY_HISTORY_LOG environment variable.
///
/// Defaults to "info" level if the variable is not set. A subscriber that is
/// already installed is left in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Connect to a storage backend, retrying with `backoff` between attempts.
///
/// `service_name` and `address` only label log lines. Returns the last error
/// once the backoff is exhausted.
pub async fn connect_with_retry<T, E, F, Fut>(
    service_name: &str,
    address: &str,
    backoff: ExponentialBuilder,
    connect: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let result = connect
        .retry(backoff)
        .notify(|err: &E, delay: Duration| {
            warn!(service = %service_name, %address, error = %err, ?delay, "Connection failed, retrying");
        })
        .await;

    match &result {
        Ok(_) => info!(service = %service_name, %address, "Connected"),
        Err(e) => error!(service = %service_name, %address, error = %e, "Giving up on connection"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::retry::connection_backoff;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }

    fn fast_backoff(times: usize) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(1))
            .with_max_times(times)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_recovers() {
        let attempts = AtomicU32::new(0);

        let result: Result<&str, String> =
            connect_with_retry("test", "local", fast_backoff(5), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(format!("refused #{n}"))
                    } else {
                        Ok("client")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("client"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_returns_last_error() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), String> =
            connect_with_retry("test", "local", fast_backoff(2), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("refused #{n}")) }
            })
            .await;

        assert_eq!(result, Err("refused #2".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_first_attempt_succeeds() {
        let result: Result<u8, String> =
            connect_with_retry("test", "local", connection_backoff(), || async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
