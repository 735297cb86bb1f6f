use crate::utils::time::sleep_with_jitter;
use std::future::Future;
use tracing::warn;

/// Retry budget for one operation. The delay doubles after every failed
/// attempt.
pub struct Backoff {
    retries_left: u32,
    delay_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(retries: u32, base_delay_ms: u64) -> Self {
        Self {
            retries_left: retries,
            delay_ms: base_delay_ms,
            attempt: 1,
        }
    }

    /// Sleeps and returns true when `error` is transient and budget remains;
    /// returns false when the caller should give up.
    pub async fn wait_after(&mut self, error: &common::Error) -> bool {
        if !error.is_transient() || self.retries_left == 0 {
            return false;
        }

        warn!(
            attempt = self.attempt,
            delay_ms = self.delay_ms,
            error = %error,
            "Transient failure, retrying"
        );
        self.retries_left -= 1;
        self.attempt += 1;
        sleep_with_jitter(self.delay_ms, self.delay_ms / 2).await;
        self.delay_ms *= 2;
        true
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// `retries` extra attempts have been spent.
pub async fn retry_with_backoff<T, F, Fut>(
    retries: u32,
    base_delay_ms: u64,
    operation: F,
) -> common::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = common::Result<T>>,
{
    let mut backoff = Backoff::new(retries, base_delay_ms);

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !backoff.wait_after(&e).await {
                    return Err(e);
                }
            }
        }
    }
}
