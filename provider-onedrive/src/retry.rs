//! Retry policy for single network attempts
//!
//! An attempt is retried only when it fails with a service status in
//! [`TRANSIENT_STATUS_CODES`](crate::error::TRANSIENT_STATUS_CODES). The
//! budget comes from [`RetryOptions`]: `retries` bounds the number of retries
//! unless `forever` is set, and `max_retry_time` bounds the elapsed time in
//! both cases. A retry whose delay would end past `max_retry_time` is not
//! attempted.

use bridge_traits::RetryOptions;
use std::future::Future;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::Result;

/// Run `attempt` until it succeeds, fails terminally or the budget is spent.
///
/// The closure receives the 0-based attempt number. On exhaustion the last
/// observed error is returned.
pub async fn with_retry<T, F, Fut>(options: &RetryOptions, operation: &str, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut retries_done: u32 = 0;

    loop {
        let error = match attempt(retries_done).await {
            Ok(value) => {
                if retries_done > 0 {
                    debug!(operation, attempts = retries_done + 1, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if error.is_transient() => error,
            Err(error) => return Err(error),
        };

        if !options.allows_retry(retries_done) {
            warn!(
                operation,
                attempts = retries_done + 1,
                error = %error,
                "Retries exhausted"
            );
            return Err(error);
        }

        let delay = options.delay_for(retries_done);
        if let Some(max_retry_time) = options.max_retry_time {
            if started.elapsed() + delay > max_retry_time {
                warn!(
                    operation,
                    attempts = retries_done + 1,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "Retry time budget exhausted"
                );
                return Err(error);
            }
        }

        retries_done += 1;
        warn!(
            operation,
            attempt = retries_done,
            delay_ms = delay.as_millis() as u64,
            status = error.status(),
            "Transient failure, retrying"
        );
        sleep(delay).await;
    }
}
