use std::time::Duration;

use tracing::warn;

use locomo_core::BenchResult;

use crate::config::RetryConfig;

/// Bounded retry with doubling backoff, applied around collaborator calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self::new(cfg.max_retries, Duration::from_millis(cfg.backoff_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Call `op` until it succeeds or `max_retries + 1` attempts have failed.
    /// The last error is returned.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> BenchResult<T>) -> BenchResult<T> {
        let mut delay = self.backoff;
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt > self.max_retries => return Err(e),
                Err(e) => {
                    warn!(
                        "{what} failed (attempt {attempt}/{}): {e}",
                        self.max_attempts()
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}
