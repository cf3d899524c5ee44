//! Retry utilities: backoff builders, connection and consumer-side read retries.
//!
//! Uses `backon` for exponential backoff with jitter. The history core never
//! retries on its own; polling consumers decide whether a failed read is
//! worth repeating. A failed `retrieve_new` leaves every cursor untouched, so
//! repeating it neither loses nor duplicates samples.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::history::History;
use crate::sample::Sample;
use crate::storage::{Result, StorageError};

/// Standard backoff for consumer reads.
///
/// - Min delay: 50ms
/// - Max delay: 2s
/// - Max attempts: 5
/// - Jitter enabled
pub fn read_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(50))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(5)
        .with_jitter()
}

/// Standard backoff for establishing backend connections.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}

/// Call `retrieve_new`, retrying transient storage failures.
pub async fn retrieve_new_with_retry(
    history: &dyn History,
    backoff: ExponentialBuilder,
) -> Result<Vec<Sample>> {
    let fetch = move || async move { history.retrieve_new().await };

    fetch
        .retry(backoff)
        .when(StorageError::is_retryable)
        .notify(|err: &StorageError, delay: Duration| {
            warn!(error = %err, ?delay, "retrieve_new failed, retrying");
        })
        .await
}
